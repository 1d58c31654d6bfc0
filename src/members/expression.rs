use super::MembershipError;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;

/// A typed reference to a workspace user, written as `<kind>:<identifier>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MemberExpression {
    ById(String),
    ByEmail(String),
    ByBotName(String),
}

impl MemberExpression {
    pub fn parse(raw: &str) -> Result<Self, MembershipError> {
        let raw = raw.trim();
        let (kind, identifier) = raw
            .split_once(':')
            .ok_or_else(|| MembershipError::InvalidExpression {
                expression: raw.to_string(),
                reason: "missing `:` separator".to_string(),
            })?;
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(MembershipError::InvalidExpression {
                expression: raw.to_string(),
                reason: "identifier must be non-empty".to_string(),
            });
        }
        let identifier = identifier.to_string();
        match kind.trim().to_ascii_lowercase().as_str() {
            "id" | "by-id" => Ok(Self::ById(identifier)),
            "email" | "by-email" => Ok(Self::ByEmail(identifier)),
            "bot" | "by-bot-name" => Ok(Self::ByBotName(identifier)),
            other => Err(MembershipError::UnsupportedExpressionKind {
                kind: other.to_string(),
            }),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::ById(_) => "id",
            Self::ByEmail(_) => "email",
            Self::ByBotName(_) => "bot",
        }
    }

    pub fn identifier(&self) -> &str {
        match self {
            Self::ById(v) | Self::ByEmail(v) | Self::ByBotName(v) => v,
        }
    }
}

impl std::fmt::Display for MemberExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind(), self.identifier())
    }
}

impl std::str::FromStr for MemberExpression {
    type Err = MembershipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for MemberExpression {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MemberExpression {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(D::Error::custom)
    }
}

/// Parses a declared member list, dropping duplicates while keeping first-seen order.
pub fn parse_expressions<I, S>(raw: I) -> Result<Vec<MemberExpression>, MembershipError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for value in raw {
        let expression = MemberExpression::parse(value.as_ref())?;
        if seen.insert(expression.clone()) {
            out.push(expression);
        }
    }
    Ok(out)
}

/// Same as [`parse_expressions`] for already-typed input.
pub fn dedupe_expressions(expressions: &[MemberExpression]) -> Vec<MemberExpression> {
    let mut seen = HashSet::new();
    expressions
        .iter()
        .filter(|e| seen.insert((*e).clone()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_supported_kind() {
        assert_eq!(
            MemberExpression::parse("id:U123").expect("id"),
            MemberExpression::ById("U123".to_string())
        );
        assert_eq!(
            MemberExpression::parse("email:a@x.com").expect("email"),
            MemberExpression::ByEmail("a@x.com".to_string())
        );
        assert_eq!(
            MemberExpression::parse("bot:deploybot").expect("bot"),
            MemberExpression::ByBotName("deploybot".to_string())
        );
    }

    #[test]
    fn long_form_kinds_are_aliases() {
        assert_eq!(
            MemberExpression::parse(" By-Email:a@x.com ").expect("email"),
            MemberExpression::ByEmail("a@x.com".to_string())
        );
        assert_eq!(
            MemberExpression::parse("by-bot-name:ci").expect("bot"),
            MemberExpression::ByBotName("ci".to_string())
        );
        assert_eq!(
            MemberExpression::parse("by-id:U9").expect("id").to_string(),
            "id:U9"
        );
    }

    #[test]
    fn rejects_missing_separator_and_empty_identifier() {
        assert!(matches!(
            MemberExpression::parse("U123"),
            Err(MembershipError::InvalidExpression { .. })
        ));
        assert!(matches!(
            MemberExpression::parse("email:  "),
            Err(MembershipError::InvalidExpression { .. })
        ));
    }

    #[test]
    fn unknown_kind_is_unsupported() {
        let err = MemberExpression::parse("group:eng").expect_err("should fail");
        match err {
            MembershipError::UnsupportedExpressionKind { kind } => assert_eq!(kind, "group"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn identifier_may_contain_separator() {
        let parsed = MemberExpression::parse("id:T1:U1").expect("parse");
        assert_eq!(parsed.identifier(), "T1:U1");
    }

    #[test]
    fn declared_lists_drop_duplicates_in_order() {
        let parsed = parse_expressions(["id:U2", "email:a@x.com", "by-id:U2"]).expect("parse list");
        assert_eq!(
            parsed.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec!["id:U2", "email:a@x.com"]
        );
    }

    #[test]
    fn serde_uses_textual_form() {
        let encoded =
            serde_json::to_string(&MemberExpression::ByBotName("ci".to_string())).expect("encode");
        assert_eq!(encoded, "\"bot:ci\"");
        let decoded: Vec<MemberExpression> =
            serde_json::from_str(r#"["email:a@x.com"]"#).expect("decode");
        assert_eq!(
            decoded,
            vec![MemberExpression::ByEmail("a@x.com".to_string())]
        );
        assert!(serde_json::from_str::<MemberExpression>("\"team:x\"").is_err());
    }
}
