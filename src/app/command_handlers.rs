use crate::app::cli::{help_text, parse_cli_verb, parse_reconcile_args, CliVerb};
use crate::app::command_support::{load_context, CommandContext};
use crate::members::{
    MemberExpression, MembershipPolicy, ReconcileOutcome, Reconciler, ResourceState,
};
use crate::state_store::MembershipRecord;

const CREATE_USAGE: &str = "create <conversation> <member>... [--authoritative|--additive]";
const READ_USAGE: &str = "read <conversation>";
const UPDATE_USAGE: &str = "update <conversation> <member>... [--authoritative|--additive]";
const DELETE_USAGE: &str = "delete <conversation> [<member>...]";
const PLAN_USAGE: &str = "plan <conversation> <member>... [--authoritative|--additive]";

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    if args.is_empty() {
        return Ok(help_text());
    }

    match parse_cli_verb(args[0].as_str()) {
        CliVerb::Create => cmd_create(&args[1..]),
        CliVerb::Read => cmd_read(&args[1..]),
        CliVerb::Update => cmd_update(&args[1..]),
        CliVerb::Delete => cmd_delete(&args[1..]),
        CliVerb::Plan => cmd_plan(&args[1..]),
        CliVerb::Whoami => cmd_whoami(),
        CliVerb::Help => Ok(help_text()),
        CliVerb::Unknown => Err(format!("unknown command `{}`", args[0])),
    }
}

fn join_ids<'a>(ids: impl IntoIterator<Item = &'a String>) -> String {
    ids.into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

fn join_members(members: &[MemberExpression]) -> String {
    members
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

pub fn render_outcome(conversation_id: &str, outcome: &ReconcileOutcome) -> String {
    let mut lines = vec![format!("conversation_id={conversation_id}")];
    match &outcome.state {
        ResourceState::Present(result) => {
            lines.push("state=present".to_string());
            lines.push(format!("member_ids={}", join_ids(&result.final_member_ids)));
            lines.push(format!(
                "members={}",
                join_members(&result.final_expressions)
            ));
        }
        ResourceState::Absent => lines.push("state=absent".to_string()),
    }
    let report = &outcome.mutations;
    lines.push(format!("added={}", join_ids(&report.added)));
    lines.push(format!("removed={}", join_ids(&report.removed)));
    lines.push(format!("absorbed={}", report.absorbed.len()));
    if report.joined {
        lines.push("joined=true".to_string());
    }
    if report.left {
        lines.push("left=true".to_string());
    }
    lines.join("\n")
}

/// Persists the post-state, or forgets the conversation when it is gone.
fn record_outcome(
    ctx: &CommandContext,
    conversation_id: &str,
    outcome: &ReconcileOutcome,
    members: Vec<MemberExpression>,
    policy: MembershipPolicy,
) -> Result<(), String> {
    match &outcome.state {
        ResourceState::Present(result) => ctx
            .store
            .save(&MembershipRecord::from_result(result, members, policy))
            .map_err(|e| e.to_string()),
        ResourceState::Absent => ctx.store.remove(conversation_id).map_err(|e| e.to_string()),
    }
}

fn recorded(
    ctx: &CommandContext,
    conversation_id: &str,
) -> Result<Option<MembershipRecord>, String> {
    ctx.store.load(conversation_id).map_err(|e| e.to_string())
}

pub fn cmd_create(args: &[String]) -> Result<String, String> {
    let parsed = parse_reconcile_args(args, CREATE_USAGE, true)?;
    let ctx = load_context()?;
    let policy = parsed.policy.unwrap_or(ctx.settings.default_policy);
    let reconciler = Reconciler::new(&ctx.client, &ctx.client, &ctx.log);
    let outcome = reconciler
        .create(&parsed.conversation_id, &parsed.members, policy)
        .map_err(|e| e.to_string())?;
    record_outcome(
        &ctx,
        &parsed.conversation_id,
        &outcome,
        parsed.members,
        policy,
    )?;
    Ok(render_outcome(&parsed.conversation_id, &outcome))
}

pub fn cmd_read(args: &[String]) -> Result<String, String> {
    let parsed = parse_reconcile_args(args, READ_USAGE, false)?;
    if !parsed.members.is_empty() {
        return Err(format!("usage: {READ_USAGE}"));
    }
    let ctx = load_context()?;
    let record = recorded(&ctx, &parsed.conversation_id)?.ok_or_else(|| {
        format!(
            "no recorded membership for conversation `{}`; run create first",
            parsed.conversation_id
        )
    })?;
    let reconciler = Reconciler::new(&ctx.client, &ctx.client, &ctx.log);
    let outcome = reconciler
        .read(&parsed.conversation_id, &record.members)
        .map_err(|e| e.to_string())?;
    let narrowed = outcome
        .result()
        .map(|result| result.final_expressions.clone())
        .unwrap_or_default();
    record_outcome(
        &ctx,
        &parsed.conversation_id,
        &outcome,
        narrowed,
        record.policy,
    )?;
    Ok(render_outcome(&parsed.conversation_id, &outcome))
}

pub fn cmd_update(args: &[String]) -> Result<String, String> {
    let parsed = parse_reconcile_args(args, UPDATE_USAGE, true)?;
    let ctx = load_context()?;
    let record = recorded(&ctx, &parsed.conversation_id)?;
    let policy = parsed
        .policy
        .or_else(|| record.as_ref().map(|r| r.policy))
        .unwrap_or(ctx.settings.default_policy);
    let previous = record.map(|r| r.members).unwrap_or_default();
    let reconciler = Reconciler::new(&ctx.client, &ctx.client, &ctx.log);
    let outcome = reconciler
        .update(&parsed.conversation_id, &parsed.members, policy, &previous)
        .map_err(|e| e.to_string())?;
    record_outcome(
        &ctx,
        &parsed.conversation_id,
        &outcome,
        parsed.members,
        policy,
    )?;
    Ok(render_outcome(&parsed.conversation_id, &outcome))
}

pub fn cmd_delete(args: &[String]) -> Result<String, String> {
    let parsed = parse_reconcile_args(args, DELETE_USAGE, false)?;
    let ctx = load_context()?;
    let previous = recorded(&ctx, &parsed.conversation_id)?
        .map(|r| r.members)
        .unwrap_or_default();
    if previous.is_empty() && parsed.members.is_empty() {
        return Err(format!(
            "nothing to delete for conversation `{}`\nusage: {DELETE_USAGE}",
            parsed.conversation_id
        ));
    }
    let reconciler = Reconciler::new(&ctx.client, &ctx.client, &ctx.log);
    let outcome = reconciler
        .delete(&parsed.conversation_id, &parsed.members, &previous)
        .map_err(|e| e.to_string())?;
    ctx.store
        .remove(&parsed.conversation_id)
        .map_err(|e| e.to_string())?;
    Ok(render_outcome(&parsed.conversation_id, &outcome))
}

pub fn cmd_plan(args: &[String]) -> Result<String, String> {
    let parsed = parse_reconcile_args(args, PLAN_USAGE, true)?;
    let ctx = load_context()?;
    let record = recorded(&ctx, &parsed.conversation_id)?;
    let policy = parsed
        .policy
        .or_else(|| record.as_ref().map(|r| r.policy))
        .unwrap_or(ctx.settings.default_policy);
    let previous = record.map(|r| r.members).unwrap_or_default();
    let reconciler = Reconciler::new(&ctx.client, &ctx.client, &ctx.log);
    let diff = reconciler
        .plan(&parsed.conversation_id, &parsed.members, policy, &previous)
        .map_err(|e| e.to_string())?;
    let mut lines = vec![
        format!("conversation_id={}", parsed.conversation_id),
        format!("policy={policy}"),
    ];
    match diff {
        Some(diff) => {
            lines.push("state=present".to_string());
            lines.push(format!("add={}", join_ids(&diff.add)));
            lines.push(format!("remove={}", join_ids(&diff.remove)));
        }
        None => lines.push("state=absent".to_string()),
    }
    Ok(lines.join("\n"))
}

pub fn cmd_whoami() -> Result<String, String> {
    let ctx = load_context()?;
    let identity = ctx.client.auth_test().map_err(|e| e.to_string())?;
    Ok(format!(
        "user_id={}\napi_base={}",
        identity.user_id,
        ctx.client.api_base()
    ))
}
