// src/pipeline/orchestrator.rs
use crate::classifier::{Classifier, NarrativeAnalysis, NarrativeAnalyzer, Navigator, TableRequest};
use crate::edgar::models::{AnnotatedDocument, FilingIdentity, StatementType};
use crate::extractors::section::{table_of_contents, KeywordStrategy, Segmenter, StatementSection};
use crate::extractors::table::ParsedTable;
use crate::extractors::units::{detect_units, DetectedUnits};
use crate::extractors::values::ValueExtractor;
use crate::pipeline::result::{ExtractionStats, FilingResult, SectionFailure, SectionSummary};
use crate::reclassify::{NarrativeSignals, ReclassificationEngine, ReclassificationRecord};
use crate::reconcile::aggregation::{compute_totals, validate};
use crate::reconcile::linkage::validate_linkage;
use crate::reconcile::normalize::normalize_signs;
use crate::reconcile::report::{LinkageReport, Tolerances, ValidationReport};
use crate::reconcile::rules::SubtotalRules;
use crate::statements::tree::StatementTree;
use crate::statements::value::{ExtractedValue, Period};
use crate::utils::config::PipelineConfig;
use crate::utils::error::{ClassifierError, PipelineError};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};

/// Lifecycle of one filing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Dispatched,
    Collecting,
    Merged,
    Validated,
    Done,
}

/// Extraction output of one statement section.
#[derive(Debug)]
struct SectionValues {
    values: Vec<ExtractedValue>,
    units: DetectedUnits,
}

/// What a statement task sends back over the results channel.
#[derive(Debug)]
struct SectionOutcome {
    statement: StatementType,
    result: Result<SectionValues, ClassifierError>,
}

type NarrativeOutcome = (StatementType, String, Result<NarrativeAnalysis, ClassifierError>);

/// Everything gathered before the deadline.
struct Collected {
    outcomes: Vec<SectionOutcome>,
    narratives: Vec<NarrativeOutcome>,
    /// Join errors of statement tasks that panicked before reporting.
    lost_tasks: Vec<String>,
}

/// Drives one filing from annotated text to a validated statement tree.
///
/// Statement sections are classified concurrently, one task each; narrative
/// sections go to the analyzers in a second wave. Both waves share one
/// deadline. Results are merged into the tree by this task alone.
pub struct Orchestrator {
    config: PipelineConfig,
    deadline: Duration,
    tolerances: Tolerances,
    rules: SubtotalRules,
    reclassifier: ReclassificationEngine,
    extractor: ValueExtractor,
    classifier: Arc<dyn Classifier>,
    navigator: Option<Arc<dyn Navigator>>,
    analyzers: Vec<Arc<dyn NarrativeAnalyzer>>,
}

impl Orchestrator {
    pub fn new(config: PipelineConfig, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            deadline: config.deadline(),
            tolerances: Tolerances::from(&config),
            config,
            rules: SubtotalRules::default(),
            reclassifier: ReclassificationEngine::default(),
            extractor: ValueExtractor::new(),
            classifier,
            navigator: None,
            analyzers: Vec::new(),
        }
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn with_analyzer(mut self, analyzer: Arc<dyn NarrativeAnalyzer>) -> Self {
        self.analyzers.push(analyzer);
        self
    }

    pub fn with_rules(mut self, rules: SubtotalRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_reclassifier(mut self, engine: ReclassificationEngine) -> Self {
        self.reclassifier = engine;
        self
    }

    /// Overrides the configured deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the whole pipeline for one filing.
    ///
    /// Fails only when no statement section is found or the deadline fires;
    /// classification failures and failed checks are reported in the result.
    pub async fn run(&self, identity: FilingIdentity, doc: &AnnotatedDocument) -> Result<FilingResult, PipelineError> {
        let deadline = Instant::now() + self.deadline;
        tracing::info!("Processing {} ({} bytes, deadline {:?})", identity, doc.len(), self.deadline);

        let segmenter = self.segmenter(doc, deadline).await;
        let sections = segmenter.segment(doc);
        let financial: Vec<&StatementSection> = sections.values().filter(|s| s.kind.is_financial()).collect();
        if financial.is_empty() {
            tracing::error!("No statement sections found for {}", identity);
            return Err(PipelineError::NothingToExtract(identity.to_string()));
        }
        let mut summaries: BTreeMap<StatementType, SectionSummary> =
            sections.values().map(|s| (s.kind, SectionSummary::new(s))).collect();

        // --- Dispatched ---
        let mut state = PipelineState::Dispatched;
        let (tx, mut rx) = mpsc::channel::<SectionOutcome>(financial.len());
        let mut statement_tasks = JoinSet::new();
        for section in &financial {
            statement_tasks.spawn(self.statement_task((*section).clone(), tx.clone()));
        }
        // Only the tasks hold senders now; the channel closes when the last one finishes.
        drop(tx);

        let mut narrative_tasks = JoinSet::new();
        for section in sections.values().filter(|s| s.kind.is_narrative()) {
            if section.len() < self.config.min_narrative_len {
                tracing::debug!("Skipping short narrative section {} ({} bytes)", section.kind, section.len());
                continue;
            }
            for analyzer in self.analyzers.iter().filter(|a| a.accepts(section.kind)) {
                let analyzer = Arc::clone(analyzer);
                let statement = section.kind;
                let text = section.text.clone();
                narrative_tasks.spawn(async move {
                    let result = analyzer.analyze(statement, &text).await;
                    (statement, analyzer.name().to_string(), result)
                });
            }
        }
        tracing::info!(
            "Dispatched {} statement tasks and {} narrative tasks",
            statement_tasks.len(),
            narrative_tasks.len()
        );

        // --- Collecting ---
        state = self.transition(state, PipelineState::Collecting);
        let collecting = async {
            let mut outcomes = Vec::new();
            while let Some(outcome) = rx.recv().await {
                outcomes.push(outcome);
            }
            let mut lost_tasks = Vec::new();
            while let Some(joined) = statement_tasks.join_next().await {
                if let Err(e) = joined {
                    tracing::warn!("Statement task ended abnormally: {}", e);
                    lost_tasks.push(e.to_string());
                }
            }
            let mut narratives = Vec::new();
            while let Some(joined) = narrative_tasks.join_next().await {
                match joined {
                    Ok(outcome) => narratives.push(outcome),
                    Err(e) => tracing::warn!("Narrative task ended abnormally: {}", e),
                }
            }
            Collected { outcomes, narratives, lost_tasks }
        };
        let waited = timeout_at(deadline, collecting).await;
        let collected = match waited {
            Ok(collected) => collected,
            Err(_) => {
                statement_tasks.abort_all();
                narrative_tasks.abort_all();
                tracing::error!("Deadline of {:?} exceeded for {}; discarding partial results", self.deadline, identity);
                return Err(PipelineError::DeadlineExceeded(self.deadline));
            }
        };

        // --- Merged ---
        let mut outcomes = collected.outcomes;
        outcomes.sort_by_key(|o| o.statement);
        let reported: BTreeSet<StatementType> = outcomes.iter().map(|o| o.statement).collect();
        let mut tree = StatementTree::new();
        let mut failures = Vec::new();
        let mut stats = ExtractionStats { sections_detected: sections.len(), ..ExtractionStats::default() };

        for outcome in outcomes {
            match outcome.result {
                Ok(extracted) => {
                    stats.sections_extracted += 1;
                    stats.values_extracted += extracted.values.len();
                    if let Some(summary) = summaries.get_mut(&outcome.statement) {
                        summary.units = Some(extracted.units);
                        summary.values_extracted = extracted.values.len();
                    }
                    for value in extracted.values {
                        tree.apply(value);
                    }
                }
                Err(e) => {
                    tracing::warn!("Skipping {} section: {}", outcome.statement, e);
                    failures.push(SectionFailure { statement: outcome.statement, error: e.to_string() });
                }
            }
        }
        // Sections whose task died without sending an outcome.
        if !collected.lost_tasks.is_empty() {
            let detail = collected.lost_tasks.join("; ");
            for section in financial.iter().filter(|s| !reported.contains(&s.kind)) {
                let error = PipelineError::Task(format!("{} extraction ended without a result ({})", section.kind, detail));
                tracing::warn!("Skipping {} section: {}", section.kind, error);
                failures.push(SectionFailure { statement: section.kind, error: error.to_string() });
            }
            failures.sort_by_key(|f| f.statement);
        }
        (stats.mapped_values, stats.unmapped_values) = tree.mapping_counts();

        let primary_year = identity.fiscal_year().or_else(|| tree.years().last().copied());
        if let Some(year) = primary_year {
            let populated = tree.populate_primary(year);
            tracing::debug!("{} values have a figure for primary year {}", populated, year);
        }
        let flipped = normalize_signs(&mut tree);
        tracing::debug!("Normalized {} signs", flipped);
        compute_totals(&mut tree, Period::Primary, &self.rules);
        state = self.transition(state, PipelineState::Merged);

        // --- Validated ---
        let (mut validation, mut linkage) = self.validate(&tree, primary_year);
        let historical_validation: Vec<ValidationReport> = tree
            .years()
            .into_iter()
            .rev()
            .filter(|y| Some(*y) != primary_year)
            .map(|y| validate(&tree, Period::Year(y), &self.rules, &self.tolerances))
            .collect();
        state = self.transition(state, PipelineState::Validated);

        let mut analyses: Vec<(StatementType, String, NarrativeAnalysis)> = Vec::new();
        for (statement, analyzer, result) in collected.narratives {
            match result {
                Ok(analysis) => analyses.push((statement, analyzer, analysis)),
                Err(e) => tracing::warn!("Narrative analysis of {} by {} failed: {}", statement, analyzer, e),
            }
        }
        analyses.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));
        stats.narratives_analyzed = analyses.len();
        let signals = NarrativeSignals::new(analyses.into_iter().map(|(s, _, a)| (s, a)).collect());

        let reclassifications: Vec<ReclassificationRecord> = self.reclassifier.apply(&mut tree, &signals);
        if !reclassifications.is_empty() {
            tracing::info!("{} items reclassified; recomputing totals", reclassifications.len());
            compute_totals(&mut tree, Period::Primary, &self.rules);
            (validation, linkage) = self.validate(&tree, primary_year);
        }
        self.transition(state, PipelineState::Done);

        tracing::info!(
            "Finished {}: {} values from {} of {} sections, {} failed checks",
            identity,
            stats.values_extracted,
            stats.sections_extracted,
            financial.len(),
            validation.failed_checks().len()
        );

        Ok(FilingResult {
            identity,
            primary_year,
            statements: tree,
            validation,
            historical_validation,
            linkage,
            reclassifications,
            narratives: signals,
            sections: summaries.into_values().collect(),
            section_failures: failures,
            stats,
        })
    }

    fn transition(&self, from: PipelineState, to: PipelineState) -> PipelineState {
        tracing::debug!("Pipeline state {:?} -> {:?}", from, to);
        to
    }

    fn validate(&self, tree: &StatementTree, year: Option<i32>) -> (ValidationReport, Option<LinkageReport>) {
        let validation = validate(tree, Period::Primary, &self.rules, &self.tolerances);
        let linkage = year.map(|y| validate_linkage(tree, y, &self.tolerances));
        (validation, linkage)
    }

    /// A segmenter whose keyword fallback also tries the navigator's titles.
    /// The navigator is optional and best effort.
    async fn segmenter(&self, doc: &AnnotatedDocument, deadline: Instant) -> Segmenter {
        let segmenter = Segmenter::new(&self.config);
        let (Some(navigator), Some(toc)) = (&self.navigator, table_of_contents(doc, self.config.toc_max_lines)) else {
            return segmenter;
        };

        let anchors = match timeout_at(deadline, navigator.locate_sections(&toc)).await {
            Ok(Ok(anchors)) => anchors,
            Ok(Err(e)) => {
                tracing::warn!("Navigator failed, using built-in headings: {}", e);
                return segmenter;
            }
            Err(_) => {
                tracing::warn!("Navigator did not answer before the deadline");
                return segmenter;
            }
        };

        let mut hints: BTreeMap<StatementType, Vec<String>> = BTreeMap::new();
        for anchor in anchors {
            if let Some(statement) = anchor.statement {
                hints.entry(statement).or_default().push(anchor.title);
            }
        }
        tracing::debug!("Navigator located titles for {} statements", hints.len());
        segmenter.with_fallback(KeywordStrategy::new(self.config.toc_skip_fraction).with_hints(hints))
    }

    /// Classification then extraction for one section, reported on `tx`.
    fn statement_task(
        &self,
        section: StatementSection,
        tx: mpsc::Sender<SectionOutcome>,
    ) -> impl std::future::Future<Output = ()> + Send + 'static {
        let classifier = Arc::clone(&self.classifier);
        let extractor = self.extractor;
        let unit_window = self.config.unit_scan_window;

        async move {
            let statement = section.kind;
            let units = detect_units(&section.text, unit_window);
            let table = ParsedTable::parse(&section.text, section.start_line);

            let result = if table.is_empty() {
                tracing::warn!("No table found in {} section (line {})", statement, section.start_line);
                Ok(SectionValues { values: Vec::new(), units })
            } else {
                let request = TableRequest { statement, text: &section.text, first_line: section.start_line };
                classifier.classify_table(request).await.map(|classification| SectionValues {
                    values: extractor.extract(statement, &table, &classification, units.amounts),
                    units,
                })
            };

            if tx.send(SectionOutcome { statement, result }).await.is_err() {
                tracing::debug!("Collector gone; dropping {} result", statement);
            }
        }
    }
}
