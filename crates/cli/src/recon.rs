//! `inactives run | validate | match | stats | decompose`: config-driven
//! extraction runs and their tooling.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use inactives_recon::classify::{format_id_list, format_labeled, format_simple};
use inactives_recon::evidence::summarize_log;
use inactives_recon::model::BatchSummary;
use inactives_recon::rules::RulesTable;
use inactives_recon::{
    decompose, extract_document, run_batch_with, AliasTable, BatchEvent, ReconError, Reference,
    ReferenceData, RunConfig,
};
use tracing::{info, warn};

use crate::exit_codes::{
    recon_exit_code, EXIT_ERROR, EXIT_RECON_INVALID_CONFIG, EXIT_RECON_MISMATCH,
    EXIT_RECON_RUNTIME, EXIT_USAGE,
};
use crate::source::{read_answers, DirAnswerSource};
use crate::util::{format_counts, format_elapsed};
use crate::CliError;

const EXPECTED_LABEL: &str = "ground truth";
const FOUND_LABEL: &str = "extracted";

fn recon_err(e: ReconError) -> CliError {
    CliError {
        code: recon_exit_code(&e),
        message: e.to_string(),
        hint: None,
    }
}

fn runtime_err(msg: impl Into<String>) -> CliError {
    CliError {
        code: EXIT_RECON_RUNTIME,
        message: msg.into(),
        hint: None,
    }
}

fn json_err(e: serde_json::Error) -> CliError {
    CliError {
        code: EXIT_ERROR,
        message: format!("JSON serialization error: {e}"),
        hint: None,
    }
}

fn read_table(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|e| runtime_err(format!("cannot read {}: {e}", path.display())))
}

fn require_file(path: &Path, what: &str) -> Result<(), CliError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(CliError {
            code: EXIT_USAGE,
            message: format!("{what} not found: {}", path.display()),
            hint: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Parse and validate a config; relative paths resolve against its directory.
fn load_config(path: &Path) -> Result<RunConfig, CliError> {
    require_file(path, "config")?;
    let text = fs::read_to_string(path)
        .map_err(|e| runtime_err(format!("cannot read config: {e}")))?;
    let mut config = RunConfig::from_toml(&text).map_err(recon_err)?;
    config.resolve_paths(path.parent().unwrap_or_else(|| Path::new(".")));
    Ok(config)
}

fn load_reference(config: &RunConfig) -> Result<Reference, CliError> {
    let r = &config.reference;
    let data = ReferenceData {
        inactive: read_table(&r.inactive)?,
        aliases: read_table(&r.aliases)?,
        ndc_spl: read_table(&r.ndc_spl)?,
        ndc_ri: read_table(&r.ndc_ri)?,
        rules: r.rules.as_deref().map(read_table).transpose()?,
    };
    Reference::load(config, &data).map_err(recon_err)
}

/// Alias table alone, for commands that never touch ground truth.
fn load_aliases(config: &RunConfig) -> Result<AliasTable, CliError> {
    let inactive = read_table(&config.reference.inactive)?;
    let aliases = read_table(&config.reference.aliases)?;
    AliasTable::from_csv(&inactive, &aliases, &config.alias_options()).map_err(recon_err)
}

fn load_rules(config: &RunConfig) -> Result<Option<RulesTable>, CliError> {
    config
        .reference
        .rules
        .as_deref()
        .map(|path| {
            RulesTable::from_csv(&read_table(path)?, &config.selection.groups).map_err(recon_err)
        })
        .transpose()
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

fn summary_lines(s: &BatchSummary, aliases: &AliasTable) -> Vec<String> {
    let mut lines = vec![
        format!(
            "{} document(s): {} all ok, {} with missing, {} with extra",
            s.documents, s.all_ok, s.with_missing, s.with_extra
        ),
        format!("missing by group: {}", format_counts(&s.missing_by_group)),
        format!("extra by group:   {}", format_counts(&s.extra_by_group)),
    ];

    let name = |id: &u32| aliases.name_of(*id).unwrap_or("?").to_string();
    for (id, n) in &s.missing_by_id {
        lines.push(format!("  missing  {} ({id}) x{n}", name(id)));
    }
    for (id, n) in &s.extra_by_id {
        lines.push(format!("  too much {} ({id}) x{n}", name(id)));
    }
    lines
}

// ---------------------------------------------------------------------------
// Run log
// ---------------------------------------------------------------------------

fn config_header(config: &RunConfig) -> Vec<String> {
    let groups: Vec<String> = config.selection.groups.iter().map(|g| g.to_string()).collect();
    let alias_types = config
        .selection
        .alias_types
        .as_ref()
        .map(|t| t.join(","))
        .unwrap_or_else(|| "all".into());
    vec![
        format!("# {}", config.name),
        format!(
            "# level={} groups={} alias_types={} description_field={}",
            config.selection.level,
            groups.join(","),
            alias_types,
            config.reference.description_field,
        ),
        format!("# rules={}", config.reference.rules.is_some()),
    ]
}

/// Run log written line by line as the batch goes, so a batch that stops
/// on a fatal error still leaves the documents settled before it.
struct RunLog {
    path: PathBuf,
    file: fs::File,
}

impl RunLog {
    fn create(dir: &Path, config: &RunConfig) -> Result<Self, CliError> {
        fs::create_dir_all(dir)
            .map_err(|e| runtime_err(format!("cannot create {}: {e}", dir.display())))?;
        let path = dir.join(format!(
            "run_{}.log",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        ));
        let file = fs::File::create(&path)
            .map_err(|e| runtime_err(format!("cannot write {}: {e}", path.display())))?;

        let mut log = Self { path, file };
        for line in config_header(config) {
            log.line(&line)?;
        }
        log.line(&format!(
            "# engine {} run_at {}",
            env!("CARGO_PKG_VERSION"),
            chrono::Utc::now().to_rfc3339()
        ))?;
        Ok(log)
    }

    fn line(&mut self, line: &str) -> Result<(), CliError> {
        writeln!(self.file, "{line}")
            .map_err(|e| runtime_err(format!("cannot write {}: {e}", self.path.display())))
    }

    fn event(&mut self, event: BatchEvent<'_>) -> Result<(), CliError> {
        match event {
            BatchEvent::Document(doc) => self.line(&format!(
                "{}/{}: {}",
                doc.set_id,
                doc.search,
                format_simple(&doc.comparison)
            )),
            BatchEvent::Skipped(search) => self.line(&format!("# skipped {search}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

pub fn cmd_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    quiet: bool,
) -> Result<(), CliError> {
    let started = Instant::now();
    let config = load_config(&config_path)?;
    let batch = config.batch.clone().ok_or_else(|| CliError {
        code: EXIT_RECON_INVALID_CONFIG,
        message: "config has no [batch] section".into(),
        hint: Some("add [batch] with answers_dir and searches".into()),
    })?;

    let reference = load_reference(&config)?;
    info!(
        name = %config.name,
        level = %config.selection.level,
        searches = batch.searches.len(),
        "run started"
    );

    if !batch.answers_dir.is_dir() {
        warn!(dir = %batch.answers_dir.display(), "answers directory does not exist");
    }
    let source = DirAnswerSource::new(&batch.answers_dir);
    let mut log = config
        .output
        .log_dir
        .as_deref()
        .map(|dir| RunLog::create(dir, &config))
        .transpose()?;
    let mut log_failure = None;

    let batch_result = run_batch_with(&config, &reference, &batch.searches, &source, |event| {
        if let Some(log) = log.as_mut() {
            if let Err(e) = log.event(event) {
                log_failure.get_or_insert(e);
            }
        }
    });
    let result = match batch_result {
        Ok(result) => result,
        Err(e) => {
            if let Some(log) = log.as_mut() {
                let _ = log.line(&format!("# aborted: {e}"));
            }
            return Err(recon_err(e));
        }
    };
    if let Some(e) = log_failure {
        return Err(e);
    }

    if !json_output {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        for doc in &result.documents {
            let c = &doc.comparison;
            let written = if quiet {
                writeln!(out, "{}/{}: {}", doc.set_id, doc.search, format_simple(c))
            } else {
                info!(set_id = %doc.set_id, search = %doc.search, ok = c.is_ok(), "document reconciled");
                writeln!(
                    out,
                    "{}/{}\n{}\nexpected: {} ; got: {}\n",
                    doc.set_id,
                    doc.search,
                    format_labeled(c, EXPECTED_LABEL, FOUND_LABEL),
                    format_id_list(&c.expected),
                    format_id_list(&c.found),
                )
            };
            written.map_err(|e| runtime_err(format!("cannot write output: {e}")))?;
        }
    }

    let elapsed = started.elapsed();

    if let Some(mut log) = log {
        log.line(&format!("elapsed {}", format_elapsed(elapsed)))?;
        eprintln!("wrote {}", log.path.display());
    }

    let json_path = output_file.or_else(|| config.output.json.clone());
    if json_output || json_path.is_some() {
        let json_str = serde_json::to_string_pretty(&result)
            .map_err(json_err)?;
        if let Some(path) = &json_path {
            fs::write(path, &json_str)
                .map_err(|e| runtime_err(format!("cannot write output: {e}")))?;
            eprintln!("wrote {}", path.display());
        }
        if json_output {
            println!("{json_str}");
        }
    }

    // Human summary to stderr
    for line in summary_lines(&result.summary, &reference.aliases) {
        eprintln!("{line}");
    }
    if !result.skipped.is_empty() {
        eprintln!("{} search(es) skipped", result.skipped.len());
    }
    eprintln!("elapsed {}", format_elapsed(elapsed));

    let s = &result.summary;
    if s.all_ok < s.documents {
        return Err(CliError {
            code: EXIT_RECON_MISMATCH,
            message: format!(
                "{} of {} document(s) disagree with ground truth",
                s.documents - s.all_ok,
                s.documents
            ),
            hint: None,
        });
    }
    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let reference = load_reference(&config)?;

    if let Some(batch) = &config.batch {
        if !batch.answers_dir.is_dir() {
            warn!(dir = %batch.answers_dir.display(), "answers directory does not exist");
        }
    }

    eprintln!(
        "valid: '{}' with {} ingredient(s), {} rule(s), level {}, {} search(es)",
        config.name,
        reference.aliases.len(),
        reference.rules.as_ref().map_or(0, RulesTable::len),
        config.selection.level,
        config.batch.as_ref().map_or(0, |b| b.searches.len()),
    );
    Ok(())
}

pub fn cmd_match(config_path: PathBuf, answer_file: PathBuf, json_output: bool) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    require_file(&answer_file, "answer file")?;

    let aliases = load_aliases(&config)?;
    let rules = load_rules(&config)?;
    let answers = read_answers(&answer_file).map_err(recon_err)?;

    let extraction = extract_document(&aliases, rules.as_ref(), &answers);

    if json_output {
        let json_str = serde_json::to_string_pretty(&extraction)
            .map_err(json_err)?;
        println!("{json_str}");
        return Ok(());
    }

    let matched: Vec<&str> = extraction.matched.iter().map(String::as_str).collect();
    let ids: Vec<u32> = extraction.ids.iter().copied().collect();
    println!("matched: {}", matched.join(", "));
    println!("ids: {}", format_id_list(&ids));
    println!("route: {}", extraction.route);
    println!("dosage form: {}", extraction.dosage_form);
    Ok(())
}

pub fn cmd_stats(config_path: PathBuf, run_log: PathBuf, json_output: bool) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    require_file(&run_log, "run log")?;

    let aliases = load_aliases(&config)?;
    let text = read_table(&run_log)?;
    let summary = summarize_log(&text, &aliases).map_err(recon_err)?;

    if json_output {
        let json_str = serde_json::to_string_pretty(&summary)
            .map_err(json_err)?;
        println!("{json_str}");
    } else {
        for line in summary_lines(&summary, &aliases) {
            println!("{line}");
        }
    }
    Ok(())
}

pub fn cmd_decompose(text: String, remove_parentheses: bool) -> Result<(), CliError> {
    for token in decompose(&text, remove_parentheses) {
        println!("{token}");
    }
    Ok(())
}
