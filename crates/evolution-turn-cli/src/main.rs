//! evo-turn-check: run every registered evolution-turn invariant for one turn.
//! - Loads a host store snapshot (proposals, turn ledger, sovereignty profiles)
//! - Applies the SMART-EVO-TURN-NEUROPC rule under an optional guard config
//! - Emits the per-turn report as JSON on stdout; exit status 1 on any failure
//! - `compile`: turns one AI-chat turn into a templated proposal, or log-only

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use evolution_turn_core::{
    hash_transcript, ChatContext, EvolutionSnapshot, EvolutionTurnInvariant, GuardConfig,
    InMemoryEvolutionStore,
};
use evolution_turn_guards::{
    default_registry, plan_turn, validate_turn, EvolutionTemplateId, EvolutionTemplateRequest,
    TurnPlan, TurnRequest, TurnSmartMeta,
};
use prometheus_bridge::{reject_if_turn_fails, InvariantMetrics, MeteredInvariant};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn required(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .required(true)
        .value_name("ID")
        .help(help)
}

fn snapshot_arg() -> Arg {
    Arg::new("snapshot")
        .long("snapshot")
        .required(true)
        .value_name("PATH")
        .help("Host store snapshot JSON: proposals, turns, profiles")
}

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .value_name("PATH")
        .help("Guard config JSON (budget + traceability policy)")
}

fn compile_command() -> Command {
    let template_names: Vec<&'static str> =
        EvolutionTemplateId::ALL.iter().map(|t| t.name()).collect();

    Command::new("compile")
        .about("Compile one AI-chat turn into a templated evolution proposal, or log-only")
        .arg(snapshot_arg())
        .arg(config_arg())
        .arg(required("validator", "Validator alias taking the turn"))
        .arg(required("proposal", "Id for the compiled proposal"))
        .arg(required("block", "Block id the proposal will be carried in"))
        .arg(required("host", "Host DID whose microspace evolves"))
        .arg(required("profile", "Microspace sovereignty profile id"))
        .arg(
            Arg::new("template")
                .long("template")
                .required(true)
                .value_name("TEMPLATE")
                .value_parser(template_names)
                .help("Evolution template to compile"),
        )
        .arg(
            Arg::new("transcript")
                .long("transcript")
                .required(true)
                .value_name("PATH")
                .help("AI-chat transcript text; its BLAKE3 hash is recorded"),
        )
        .arg(
            Arg::new("summary")
                .long("summary")
                .required(true)
                .value_name("TEXT")
                .help("Human-readable summary of the chat turn"),
        )
        .arg(
            Arg::new("at")
                .long("at")
                .value_name("RFC3339")
                .help("Turn time (defaults to now)"),
        )
        .arg(
            Arg::new("epoch")
                .long("epoch")
                .value_name("N")
                .value_parser(value_parser!(u64))
                .default_value("0")
                .help("Learning epoch tagged onto the turn"),
        )
        .arg(
            Arg::new("shard")
                .long("shard")
                .value_name("ID")
                .default_value("qpudatashard-local")
                .help("qpudatashard id tagged onto the turn"),
        )
}

fn cli() -> Command {
    Command::new("evo-turn-check")
        .about("Per-turn evolution invariant check (budget, traceability/consent, microspace sovereignty)")
        .subcommand_negates_reqs(true)
        .arg(snapshot_arg())
        .arg(config_arg())
        .arg(required("validator", "Validator alias submitting the turn"))
        .arg(required("proposal", "Evolution proposal id"))
        .arg(required("block", "Block id carrying the proposal"))
        .arg(required("transcript-hash", "BLAKE3 hash of the AI-chat transcript"))
        .arg(required("profile", "Microspace sovereignty profile id"))
        .arg(
            Arg::new("irreversible-required")
                .long("irreversible-required")
                .action(ArgAction::SetTrue)
                .help("Require irreversible token linkage for this turn"),
        )
        .arg(
            Arg::new("metrics")
                .long("metrics")
                .action(ArgAction::SetTrue)
                .help("Print Prometheus exposition of the evaluation to stderr"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .value_parser(["text", "json"])
                .default_value("text")
                .global(true)
                .help("Log output format on stderr"),
        )
        .subcommand(compile_command())
}

fn init_tracing(format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn arg<'a>(matches: &'a ArgMatches, name: &str) -> anyhow::Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("missing --{name}"))
}

fn load_store(path: &Path) -> anyhow::Result<InMemoryEvolutionStore> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    let snapshot = EvolutionSnapshot::from_json_str(&raw)
        .with_context(|| format!("failed to parse snapshot {}", path.display()))?;
    info!(
        proposals = snapshot.proposals.len(),
        turns = snapshot.turns.len(),
        profiles = snapshot.profiles.len(),
        "loaded evolution snapshot"
    );
    Ok(InMemoryEvolutionStore::from_snapshot(snapshot)?)
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<GuardConfig> {
    Ok(match matches.get_one::<String>("config") {
        Some(path) => GuardConfig::from_path(path)?,
        None => GuardConfig::default(),
    })
}

fn run(matches: &ArgMatches) -> anyhow::Result<bool> {
    let store = Arc::new(load_store(Path::new(arg(matches, "snapshot")?))?);
    let config = load_config(matches)?;

    let metrics = Arc::new(InvariantMetrics::new().context("register metrics")?);
    let registry = default_registry(store, config, |rule| -> Arc<dyn EvolutionTurnInvariant> {
        Arc::new(MeteredInvariant::new(rule, Arc::clone(&metrics)))
    })?;

    let request = TurnRequest {
        validator_alias: arg(matches, "validator")?.to_string(),
        proposal_id: arg(matches, "proposal")?.to_string(),
        block_id: arg(matches, "block")?.to_string(),
        transcripthash: arg(matches, "transcript-hash")?.to_string(),
        irreversible_required: matches.get_flag("irreversible-required"),
        sovereignty_profile_id: arg(matches, "profile")?.to_string(),
    };

    let report = validate_turn(&registry, &request);
    let rejected = reject_if_turn_fails(&metrics, &report);
    info!(
        evaluation_id = %report.evaluation_id,
        proposal_id = %report.proposal_id,
        rejected,
        "evolution turn evaluated"
    );

    println!("{}", serde_json::to_string_pretty(&report)?);
    if matches.get_flag("metrics") {
        eprint!("{}", metrics.render_text()?);
    }
    Ok(!rejected)
}

fn run_compile(matches: &ArgMatches) -> anyhow::Result<TurnPlan> {
    let store = load_store(Path::new(arg(matches, "snapshot")?))?;
    let config = load_config(matches)?;

    let template_name = arg(matches, "template")?;
    let template = EvolutionTemplateId::from_name(template_name)
        .with_context(|| format!("unknown template '{template_name}'"))?;

    let transcript_path = arg(matches, "transcript")?;
    let transcript = std::fs::read_to_string(transcript_path)
        .with_context(|| format!("failed to read transcript {transcript_path}"))?;

    let submitted_at = match matches.get_one::<String>("at") {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("invalid --at '{raw}'"))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };
    let epoch = matches.get_one::<u64>("epoch").copied().unwrap_or(0);

    let request = EvolutionTemplateRequest {
        template,
        proposal_id: arg(matches, "proposal")?.to_string(),
        validator_alias: arg(matches, "validator")?.to_string(),
        block_id: arg(matches, "block")?.to_string(),
        host_did: arg(matches, "host")?.to_string(),
        sovereignty_profile_id: arg(matches, "profile")?.to_string(),
        submitted_at,
        chat: ChatContext {
            transcripthash: hash_transcript(&transcript),
            summary: arg(matches, "summary")?.to_string(),
        },
    };

    let plan = plan_turn(
        &store,
        &config.budget,
        request,
        TurnSmartMeta::for_epoch(epoch, arg(matches, "shard")?),
    );
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(plan)
}

fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    let scope = matches.subcommand().map_or(&matches, |(_, sub)| sub);
    let format = scope
        .get_one::<String>("log-format")
        .map(String::as_str)
        .unwrap_or("text");
    init_tracing(format);

    if let Some(("compile", sub)) = matches.subcommand() {
        run_compile(sub)?;
        return Ok(());
    }
    if !run(&matches)? {
        eprintln!("evo-turn-check: evolution turn REJECTED");
        std::process::exit(1);
    }
    Ok(())
}
