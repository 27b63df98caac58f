use std::{
    cell::OnceCell,
    path::{Path, PathBuf},
};

use anyhow::{Context as _, Result, anyhow};
use colored::Colorize;
use rayon::prelude::*;

use crate::{
    cli::args::ScanArgs,
    config::{Config, load_config},
    core::{
        catalog::match_call,
        custom::{CustomFunctions, resolve_custom_calls},
        extract::{EventName, TrackingRecord, provider_records},
        file_scanner::{ScanOptions, scan_files},
        parsers::lower_file,
        syntax::{CallSite, FileUnit, Language},
    },
    issues::{Issue, ParseErrorIssue, UnresolvedEventIssue},
};

/// A source file selected for scanning.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path used to read the file.
    pub path: PathBuf,
    /// Path shown in reports, relative to the scan root.
    pub display_path: String,
    pub language: Language,
}

/// Everything a scan produced, in output order.
#[derive(Debug, Default)]
pub struct ScanOutput {
    pub records: Vec<TrackingRecord>,
    pub issues: Vec<Issue>,
    pub files_scanned: usize,
    pub files_failed: usize,
}

/// Core analysis context orchestrating the scan pipeline.
///
/// # Phases
///
/// 1. **Parse**: every file is read, parsed and lowered into a [`FileUnit`],
///    in parallel. Failures become `ParseError` issues.
/// 2. **Match**: call sites are matched against the provider catalog, in
///    parallel per file. Custom-function call sites are set aside.
/// 3. **Custom**: custom call sites are resolved sequentially in file path
///    then source order, so each function's first call site fixes its roles.
///
/// Each phase is computed on first access and cached in a `OnceCell`.
///
/// # Configuration Priority
///
/// 1. CLI arguments (e.g. `--custom-function`, `--jobs`)
/// 2. `.trackscanrc.json` config file
/// 3. Built-in defaults
pub struct ScanContext {
    /// Merged configuration (CLI args > config file > defaults).
    pub config: Config,

    /// Scan root directory.
    pub root_dir: PathBuf,

    /// Files to scan, sorted by display path.
    pub files: Vec<SourceFile>,

    pub custom_functions: CustomFunctions,

    /// Emit an `UnresolvedEvent` warning per record without a literal event name.
    pub include_unmatched: bool,

    pub verbose: bool,

    pool: Option<rayon::ThreadPool>,

    file_units: OnceCell<Vec<FileUnit>>,
    parse_errors: OnceCell<Vec<ParseErrorIssue>>,
    output: OnceCell<ScanOutput>,
}

impl ScanContext {
    /// Create a new `ScanContext` from command line arguments.
    ///
    /// Loads and merges configuration, compiles custom function signatures and
    /// walks the scan root. Invalid configuration is an error.
    pub fn new(args: &ScanArgs) -> Result<Self> {
        let verbose = args.verbose;
        let root_dir = args.path.clone();
        let root = root_dir
            .to_str()
            .with_context(|| format!("Invalid path: {:?}", root_dir))?;
        if !root_dir.is_dir() {
            return Err(anyhow!("Scan root is not a directory: {}", root_dir.display()));
        }

        let config_result = load_config(&root_dir)?;
        if verbose && !config_result.from_file {
            eprintln!("Note: No .trackscanrc.json found, using default configuration");
        }

        let mut config = config_result.config;
        config
            .custom_functions
            .extend(args.custom_functions.iter().cloned());
        config
            .custom_function_patterns
            .extend(args.custom_patterns.iter().cloned());
        if args.jobs.is_some() {
            config.jobs = args.jobs;
        }
        config.validate()?;

        let custom_functions =
            CustomFunctions::new(&config.custom_functions, &config.custom_function_patterns)?;

        let pool = match config.jobs {
            Some(jobs) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(jobs)
                    .build()
                    .context("Failed to start worker pool")?,
            ),
            None => None,
        };

        let languages = config.enabled_languages();
        let scan_result = scan_files(
            root,
            &ScanOptions {
                includes: &config.includes,
                ignores: &config.ignores,
                ignore_test_files: config.ignore_test_files,
                languages: &languages,
                verbose,
            },
        );

        if scan_result.skipped_count > 0 {
            eprintln!(
                "{} {} path(s) skipped due to access errors{}",
                "warning:".bold().yellow(),
                scan_result.skipped_count,
                if verbose { "" } else { " (use -v for details)" }
            );
        }

        let mut files: Vec<SourceFile> = scan_result
            .files
            .into_iter()
            .filter_map(|file| {
                let path = PathBuf::from(file);
                let language = Language::from_path(&path)?;
                let display_path = display_path(&root_dir, &path);
                Some(SourceFile {
                    path,
                    display_path,
                    language,
                })
            })
            .collect();
        files.sort_by(|a, b| a.display_path.cmp(&b.display_path));

        tracing::debug!(
            root = %root_dir.display(),
            files = files.len(),
            custom_functions = config.custom_functions.len(),
            "scan context ready"
        );

        Ok(Self {
            config,
            root_dir,
            files,
            custom_functions,
            include_unmatched: args.include_unmatched_diagnostics,
            verbose,
            pool,
            file_units: OnceCell::new(),
            parse_errors: OnceCell::new(),
            output: OnceCell::new(),
        })
    }

    /// Run `op` on the configured worker pool, or rayon's global pool.
    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    /// Phase 1: lowered call sites of every parsable file, sorted by path.
    pub fn file_units(&self) -> &Vec<FileUnit> {
        self.file_units.get_or_init(|| {
            let _span = tracing::debug_span!("parse", files = self.files.len()).entered();

            let files = &self.files;
            let results: Vec<_> = self.install(|| {
                files
                    .par_iter()
                    .map(|file| {
                        let result = std::fs::read_to_string(&file.path)
                            .map_err(|e| anyhow!("Failed to read file: {}", e))
                            .and_then(|code| lower_file(code, &file.display_path, file.language));
                        (file, result)
                    })
                    .collect()
            });

            let mut units = Vec::new();
            let mut errors = Vec::new();
            for (file, result) in results {
                match result {
                    Ok(unit) => units.push(unit),
                    Err(e) => {
                        if self.verbose {
                            eprintln!(
                                "{} {} - {}",
                                "warning:".bold().yellow(),
                                file.display_path,
                                e
                            );
                        }
                        errors.push(ParseErrorIssue {
                            file_path: file.display_path.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }

            tracing::debug!(parsed = units.len(), failed = errors.len(), "parsed files");
            let _ = self.parse_errors.set(errors);
            units
        })
    }

    /// Files that could not be read or parsed.
    pub fn parse_errors(&self) -> &Vec<ParseErrorIssue> {
        self.file_units();
        self.parse_errors.get_or_init(Vec::new)
    }

    /// Phases 2 and 3: records and diagnostics of the whole scan.
    pub fn output(&self) -> &ScanOutput {
        self.output.get_or_init(|| {
            let units = self.file_units();

            let matched: Vec<(Vec<TrackingRecord>, Vec<&CallSite>)> = {
                let _span = tracing::debug_span!("match", files = units.len()).entered();
                let custom_functions = &self.custom_functions;
                self.install(|| {
                    units
                        .par_iter()
                        .map(|unit| match_unit(custom_functions, unit))
                        .collect()
                })
            };

            let custom = {
                let _span = tracing::debug_span!("custom").entered();
                resolve_custom_calls(
                    &self.custom_functions,
                    matched.iter().flat_map(|(_, sites)| sites.iter().copied()),
                )
            };

            let mut records: Vec<TrackingRecord> = matched
                .into_iter()
                .flat_map(|(records, _)| records)
                .chain(custom.records)
                .collect();
            records.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

            let mut issues: Vec<Issue> = self
                .parse_errors()
                .iter()
                .cloned()
                .map(Issue::ParseError)
                .chain(custom.issues)
                .collect();
            if self.include_unmatched {
                issues.extend(records.iter().filter_map(unresolved_event_issue));
            }
            issues.sort();

            ScanOutput {
                records,
                issues,
                files_scanned: self.files.len(),
                files_failed: self.parse_errors().len(),
            }
        })
    }

    /// Run the scan to completion and take its output.
    pub fn into_output(self) -> ScanOutput {
        self.output();
        self.output.into_inner().unwrap_or_default()
    }
}

/// Provider records of one file, plus its custom-function call sites.
fn match_unit<'u>(
    custom_functions: &CustomFunctions,
    unit: &'u FileUnit,
) -> (Vec<TrackingRecord>, Vec<&'u CallSite>) {
    let mut records = Vec::new();
    let mut custom_sites = Vec::new();

    for site in &unit.call_sites {
        // Configured wrappers win over provider methods of the same name.
        let is_custom = !custom_functions.is_empty()
            && site
                .callee_name()
                .is_some_and(|name| custom_functions.lookup(&name).is_some());
        if is_custom {
            custom_sites.push(site);
            continue;
        }
        if let Some(matched) = match_call(site, unit.language) {
            records.extend(provider_records(site, matched));
        }
    }

    (records, custom_sites)
}

fn unresolved_event_issue(record: &TrackingRecord) -> Option<Issue> {
    let EventName::Unresolved { expression, .. } = &record.event else {
        return None;
    };
    Some(Issue::UnresolvedEvent(UnresolvedEventIssue {
        context: record.context.clone(),
        destination: record.source.id().to_string(),
        expression: expression.clone(),
    }))
}

/// Path relative to the scan root, with `/` separators.
fn display_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
