//! vttdice engine - command line entry point.
//!
//! ```text
//! vttdice-engine roll '<json>' [confirm|decline]
//! vttdice-engine history <session-id> [limit]
//! vttdice-engine rulesets
//! ```

use anyhow::{bail, Context};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vttdice_domain::{
    evaluate_dice, AnimationSequence, CharacterId, CharacterSnapshot, DeclaredMode,
    RollContext, RollHistoryRecord, RollNotation, RollPhase, SessionId,
};
use vttdice_engine::{App, EngineConfig};

/// Roll request as accepted on the command line. Ids are generated when
/// omitted; the snapshot's `sagaPoints` seeds the resource store.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RollRequest {
    #[serde(default)]
    character_id: Option<CharacterId>,
    #[serde(default = "default_character_name")]
    character_name: String,
    #[serde(default)]
    session_id: Option<SessionId>,
    #[serde(default)]
    system_slug: Option<String>,
    #[serde(default)]
    label: String,
    #[serde(default)]
    roll_type: Option<String>,
    #[serde(default)]
    declared_mode: DeclaredMode,
    #[serde(default)]
    roll_target: Option<u32>,
    #[serde(default)]
    character: CharacterSnapshot,
}

fn default_character_name() -> String {
    "Anonymous".to_string()
}

impl RollRequest {
    fn into_context(self, default_ruleset: &str) -> RollContext {
        let mut ctx = RollContext::new(
            self.character_id.unwrap_or_default(),
            self.character_name,
            self.session_id.unwrap_or_default(),
            self.system_slug
                .unwrap_or_else(|| default_ruleset.to_string()),
        )
        .with_label(self.label)
        .with_mode(self.declared_mode)
        .with_character(self.character);

        if let Some(roll_type) = self.roll_type {
            ctx = ctx.with_roll_type(roll_type);
        }
        if let Some(target) = self.roll_target {
            ctx = ctx.with_target(target);
        }
        ctx
    }
}

#[derive(Debug, Clone, Copy)]
enum Decision {
    Confirm,
    Decline,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root (the binary may run from `crates/engine`).
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vttdice_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        print_usage();
        return Ok(());
    };

    let config = EngineConfig::from_env();
    let app = App::from_config(config).await?;

    let result = run(&app, command, &args).await;
    app.shutdown().await;
    result
}

async fn run(app: &App, command: &str, args: &[String]) -> anyhow::Result<()> {
    match command {
        "roll" => {
            let json = args.get(1).context("roll needs a JSON context")?;
            let decision = match args.get(2).map(String::as_str) {
                None => None,
                Some("confirm") => Some(Decision::Confirm),
                Some("decline") => Some(Decision::Decline),
                Some(other) => bail!("Unknown escalation decision: {other}"),
            };
            roll(app, json, decision).await
        }
        "history" => {
            let session_id: SessionId = args
                .get(1)
                .context("history needs a session id")?
                .parse()
                .context("Invalid session id")?;
            let limit = args
                .get(2)
                .map(|s| s.parse::<u32>())
                .transpose()
                .context("Invalid limit")?;
            history(app, session_id, limit).await
        }
        "rulesets" => {
            for (slug, name) in app.registry.list_rulesets_with_names() {
                println!("{slug}\t{name}");
            }
            Ok(())
        }
        other => {
            print_usage();
            bail!("Unknown command: {other}")
        }
    }
}

async fn roll(app: &App, json: &str, decision: Option<Decision>) -> anyhow::Result<()> {
    let request: RollRequest = serde_json::from_str(json).context("Invalid roll JSON")?;
    let ctx = request.into_context(&app.config.default_ruleset);
    app.repositories
        .resources
        .set(ctx.character_id, ctx.character.saga_points)
        .await?;

    let outcome = match app.use_cases.roll.perform.execute(ctx).await {
        Ok(outcome) => outcome,
        Err(e) => {
            println!(
                "{}",
                serde_json::json!({ "error": { "code": e.code(), "message": e.to_string() } })
            );
            return Ok(());
        }
    };

    play(app, &outcome.report.animation).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if outcome.phase != RollPhase::AwaitingDecision {
        return Ok(());
    }

    let settled = match decision {
        Some(Decision::Confirm) => app.use_cases.roll.escalation.confirm(outcome.roll_id).await?,
        Some(Decision::Decline) => app.use_cases.roll.escalation.decline(outcome.roll_id).await?,
        None => {
            tracing::info!(roll_id = %outcome.roll_id, "Escalation offered, no decision given");
            return Ok(());
        }
    };

    if settled.phase == RollPhase::Final {
        play(app, &settled.report.animation).await?;
    }
    println!("{}", serde_json::to_string_pretty(&settled)?);
    Ok(())
}

/// Print playback frames as JSON lines; Ctrl-C skips to the end.
async fn play(app: &App, sequence: &AnimationSequence) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let skip = cancel.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            skip.cancel();
        }
    });

    let (mut frames, handle) = app.player.play(sequence, cancel);
    while let Some(frame) = frames.recv().await {
        println!("{}", serde_json::to_string(&frame)?);
    }
    handle.await?;
    ctrl_c.abort();
    Ok(())
}

async fn history(app: &App, session_id: SessionId, limit: Option<u32>) -> anyhow::Result<()> {
    let records = app
        .repositories
        .history
        .list_for_session(session_id, limit)
        .await?;

    for record in &records {
        let audit = audit(record)?;
        println!(
            "{}",
            serde_json::json!({ "record": record, "audit": audit })
        );
    }
    tracing::info!(session_id = %session_id, count = records.len(), "Listed roll history");
    Ok(())
}

/// Re-derive waves and raw successes of the base draw from notation and
/// stored dice.
fn audit(record: &RollHistoryRecord) -> anyhow::Result<serde_json::Value> {
    let params = RollNotation::parse(&record.notation)
        .with_context(|| format!("Roll {} has bad notation", record.roll_id))?
        .to_params();

    let bonus = record
        .result
        .meta
        .bonus_roll
        .as_ref()
        .map(Vec::len)
        .unwrap_or(0);
    let dice = &record.result.all_dice;
    let base = dice[..dice.len().saturating_sub(bonus)].to_vec();

    let raw = evaluate_dice(base, &params);

    Ok(serde_json::json!({
        "waves": raw.waves,
        "rawSuccesses": raw.successes,
        "critical": raw.flags.critical,
        "botched": raw.flags.botched,
    }))
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  vttdice-engine roll '<json>' [confirm|decline]");
    eprintln!("  vttdice-engine history <session-id> [limit]");
    eprintln!("  vttdice-engine rulesets");
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
