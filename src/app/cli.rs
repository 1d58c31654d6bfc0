use crate::members::{parse_expressions, MemberExpression, MembershipPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Create,
    Read,
    Update,
    Delete,
    Plan,
    Whoami,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "create" => CliVerb::Create,
        "read" => CliVerb::Read,
        "update" => CliVerb::Update,
        "delete" => CliVerb::Delete,
        "plan" => CliVerb::Plan,
        "whoami" => CliVerb::Whoami,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Commands:".to_string(),
        "  create <conversation> <member>... [--authoritative|--additive]".to_string(),
        "                                       Invite declared members and record them"
            .to_string(),
        "  read <conversation>                  Refresh the recorded members from Slack"
            .to_string(),
        "  update <conversation> <member>... [--authoritative|--additive]".to_string(),
        "                                       Converge the conversation to the new list"
            .to_string(),
        "  delete <conversation> [<member>...]  Remove every recorded and listed member"
            .to_string(),
        "  plan <conversation> <member>... [--authoritative|--additive]".to_string(),
        "                                       Show the adds and removes an update would make"
            .to_string(),
        "  whoami                               Show the user that owns the Slack token"
            .to_string(),
        String::new(),
        "Members: id:<user id>, email:<address>, bot:<bot name>".to_string(),
    ]
}

pub fn help_text() -> String {
    cli_help_lines().join("\n")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileArgs {
    pub conversation_id: String,
    pub members: Vec<MemberExpression>,
    pub policy: Option<MembershipPolicy>,
}

/// Parses `<conversation> [<member>...] [--authoritative|--additive]`.
pub fn parse_reconcile_args(
    args: &[String],
    usage: &str,
    require_members: bool,
) -> Result<ReconcileArgs, String> {
    let mut positional = Vec::new();
    let mut policy = None;
    for arg in args {
        match arg.as_str() {
            "--authoritative" => policy = Some(MembershipPolicy::Authoritative),
            "--additive" => policy = Some(MembershipPolicy::Additive),
            flag if flag.starts_with("--") => {
                return Err(format!("unknown flag `{flag}`\nusage: {usage}"));
            }
            value => positional.push(value),
        }
    }

    let Some((conversation_id, members)) = positional.split_first() else {
        return Err(format!("usage: {usage}"));
    };
    if conversation_id.trim().is_empty() || (require_members && members.is_empty()) {
        return Err(format!("usage: {usage}"));
    }
    let members = parse_expressions(members.iter()).map_err(|e| e.to_string())?;
    Ok(ReconcileArgs {
        conversation_id: conversation_id.trim().to_string(),
        members,
        policy,
    })
}
