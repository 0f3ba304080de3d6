use std::path::PathBuf;
use std::time::Duration;

use larkcore_config::{marker, Settings};
use larkcore_index::{ConversionTarget, Partition, PartitionRecords};
use larkcore_query::{apply_drop, evaluate, InsertSide, LevelBound, SearchCriterion};
use serde::Serialize;

use crate::highlight::{apply_highlight, HighlightWindow, ResultRow};
use crate::loader::{pending_species, SpeciesBatch, SpeciesRequest};
use crate::pipeline::{ConversionOutcome, ConversionRequest, ForceFlags};
use crate::storage::{load_saved_searches, persist_saved_searches, StoragePaths};

const NEW_SEARCH_ORDER_GAP: f64 = 100.0;

#[derive(Debug)]
pub enum Command {
    Start,
    SaveChangeDetected,
    ReloadDue,
    Refresh { force: bool },
    ToolDataUpdated(Result<(), String>),
    ConversionFinished(ConversionOutcome),
    SpeciesLoaded(SpeciesBatch),
    SettingsChanged(Settings),
    SelectSearches(Vec<usize>),
    ShowTames,
    ShowWild,
    AddSearch(SearchCriterion),
    RemoveSearch(usize),
    StepLevel {
        index: usize,
        bound: LevelBound,
        delta: i32,
    },
    StepGender {
        index: usize,
        delta: i32,
    },
    DropSearch {
        source: usize,
        target: usize,
        side: InsertSide,
    },
    SearchTextChanged {
        text: String,
        window: HighlightWindow,
    },
    HighlightDue(String),
}

#[derive(Debug)]
pub enum Effect {
    UpdateToolData,
    Convert(ConversionRequest),
    LoadSpecies(SpeciesRequest),
    ScheduleHighlight {
        text: String,
        window: HighlightWindow,
    },
    WatchSave {
        file: PathBuf,
        quiet_window: Duration,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    #[default]
    Hunt,
    Tames,
}

impl View {
    fn partition(self) -> Partition {
        match self {
            View::Hunt => Partition::Wild,
            View::Tames => Partition::Tamed,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Status {
    pub text: String,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub status: Status,
    pub loading: bool,
    pub view: View,
    pub searches: Vec<SearchCriterion>,
    pub selected: Vec<usize>,
    pub results: Vec<ResultRow>,
    pub last_error: Option<String>,
    pub wild_species: Vec<String>,
    pub tamed_species: Vec<String>,
}

pub struct AppState {
    settings: Settings,
    paths: StoragePaths,
    wild: PartitionRecords,
    tamed: PartitionRecords,
    searches: Vec<SearchCriterion>,
    selected: Vec<usize>,
    results: Vec<ResultRow>,
    search_text: String,
    view: View,
    loading: bool,
    force: ForceFlags,
    status: Status,
    last_error: Option<String>,
}

impl AppState {
    pub fn new(settings: Settings, paths: StoragePaths) -> Self {
        Self {
            settings,
            paths,
            wild: PartitionRecords::default(),
            tamed: PartitionRecords::default(),
            searches: Vec::new(),
            selected: Vec::new(),
            results: Vec::new(),
            search_text: String::new(),
            view: View::Hunt,
            loading: false,
            force: ForceFlags::default(),
            status: Status::default(),
            last_error: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn force_flags(&self) -> ForceFlags {
        self.force
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn searches(&self) -> &[SearchCriterion] {
        &self.searches
    }

    pub fn results(&self) -> &[ResultRow] {
        &self.results
    }

    pub fn records(&self, partition: Partition) -> &PartitionRecords {
        match partition {
            Partition::Wild => &self.wild,
            Partition::Tamed => &self.tamed,
        }
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            status: self.status.clone(),
            loading: self.loading,
            view: self.view,
            searches: self.searches.clone(),
            selected: self.selected.clone(),
            results: self.results.clone(),
            last_error: self.last_error.clone(),
            wild_species: self.wild.all_species().to_vec(),
            tamed_species: self.tamed.all_species().to_vec(),
        }
    }

    pub fn handle(&mut self, command: Command) -> Vec<Effect> {
        match command {
            Command::Start => self.start(),
            Command::SaveChangeDetected => {
                self.set_status("Detected change to saved ARK...", "...waiting");
                Vec::new()
            }
            Command::ReloadDue => self.reload(false),
            Command::Refresh { force } => self.reload(force),
            Command::ToolDataUpdated(result) => {
                match result {
                    Ok(()) => self.set_status("Updated ark-tools database", ""),
                    Err(err) => {
                        self.set_status(format!("Failed to update ark-tools database: {err}"), "")
                    }
                }
                self.reload(false)
            }
            Command::ConversionFinished(outcome) => self.finish_conversion(outcome),
            Command::SpeciesLoaded(batch) => self.finish_species(batch),
            Command::SettingsChanged(settings) => self.change_settings(settings),
            Command::SelectSearches(indices) => {
                self.selected = indices
                    .into_iter()
                    .filter(|index| *index < self.searches.len())
                    .collect();
                self.refresh_results()
            }
            Command::ShowTames => self.show_tames(),
            Command::ShowWild => self.show_wild(),
            Command::AddSearch(criterion) => self.add_search(criterion),
            Command::RemoveSearch(index) => self.remove_search(index),
            Command::StepLevel {
                index,
                bound,
                delta,
            } => {
                let (step, max) = (self.settings.level_step, self.settings.max_level);
                self.edit_search(index, |criterion| {
                    criterion.step_level(bound, delta, step, max)
                })
            }
            Command::StepGender { index, delta } => self.edit_search(index, |criterion| {
                criterion.gender = criterion.gender.step(delta);
            }),
            Command::DropSearch {
                source,
                target,
                side,
            } => {
                if apply_drop(&mut self.searches, source, target, side) {
                    self.save_searches();
                }
                Vec::new()
            }
            Command::SearchTextChanged { text, window } => {
                self.search_text = text.clone();
                vec![Effect::ScheduleHighlight { text, window }]
            }
            Command::HighlightDue(text) => {
                apply_highlight(&mut self.results, &text);
                Vec::new()
            }
        }
    }

    fn start(&mut self) -> Vec<Effect> {
        self.ensure_output_dir();
        self.searches = load_saved_searches(&self.paths.searches);
        self.check_if_source_changed(false);

        self.set_status("Updating ark-tools database", "");
        vec![self.watch_effect(), Effect::UpdateToolData]
    }

    fn reload(&mut self, force: bool) -> Vec<Effect> {
        if self.loading {
            tracing::debug!(force, "load already in progress, dropping trigger");
            return Vec::new();
        }
        self.loading = true;

        let armed = std::mem::take(&mut self.force);
        self.set_status("Processing saved ARK : Wild", "...converting");
        vec![Effect::Convert(ConversionRequest {
            target: self.target(),
            force,
            armed,
        })]
    }

    fn finish_conversion(&mut self, outcome: ConversionOutcome) -> Vec<Effect> {
        for (partition, records) in outcome.converted {
            match partition {
                Partition::Wild => self.wild = records,
                Partition::Tamed => self.tamed = records,
            }
        }

        for partition in Partition::ALL {
            if outcome.armed.get(partition) && !outcome.attempted.contains(&partition) {
                self.force.set(partition, true);
            }
        }

        match outcome.result {
            Ok((wild, tamed)) => {
                self.last_error = None;
                self.set_status(
                    "ARK processing completed",
                    format!("{wild} wild and {tamed} tame species located"),
                );
            }
            Err(err) => {
                self.last_error = Some(err.to_string());
                self.set_status("ARK processing failed", "");
            }
        }

        let mut species = pending_species(Partition::Wild, &self.wild);
        species.extend(pending_species(Partition::Tamed, &self.tamed));
        if species.is_empty() {
            return self.finish_loading();
        }

        self.set_progress(format!("Loading {} species...", species.len()));
        vec![Effect::LoadSpecies(SpeciesRequest {
            target: self.target(),
            species,
        })]
    }

    fn finish_species(&mut self, batch: SpeciesBatch) -> Vec<Effect> {
        for (partition, species, dinos) in batch.loaded {
            let records = match partition {
                Partition::Wild => &mut self.wild,
                Partition::Tamed => &mut self.tamed,
            };
            records.insert_species(species, dinos);
        }

        if let Some((partition, species, err)) = batch.failures.first() {
            self.last_error = Some(format!("failed to load {partition} {species}: {err}"));
            self.status.text = format!("Failed to load {species}");
        }

        self.finish_loading()
    }

    fn finish_loading(&mut self) -> Vec<Effect> {
        self.loading = false;
        if self.last_error.is_none() {
            self.status.text = "Ready".to_string();
        }
        self.refresh_results()
    }

    fn change_settings(&mut self, settings: Settings) -> Vec<Effect> {
        self.settings = settings;
        self.ensure_output_dir();
        self.save_settings();

        let mut effects = self.check_if_source_changed(true);
        effects.push(self.watch_effect());
        effects.extend(self.refresh_results());
        effects
    }

    /// Arms both partitions when the marker does not match the configured save.
    fn check_if_source_changed(&mut self, reconvert: bool) -> Vec<Effect> {
        let output_dir = self.settings.resolved_output_dir();
        if !marker::is_stale(&output_dir, &self.settings.save_file) {
            return Vec::new();
        }

        tracing::info!(save = %self.settings.save_file.display(), "save file changed since last conversion");
        self.force.arm_all();
        if reconvert {
            self.reload(true)
        } else {
            Vec::new()
        }
    }

    fn show_tames(&mut self) -> Vec<Effect> {
        self.view = View::Tames;
        self.searches = std::iter::once(SearchCriterion::wildcard())
            .chain(
                self.tamed
                    .all_species()
                    .iter()
                    .map(|species| SearchCriterion::for_species(species.clone())),
            )
            .enumerate()
            .map(|(order, criterion)| SearchCriterion {
                order: order as f64,
                ..criterion
            })
            .collect();
        self.selected.clear();
        self.refresh_results()
    }

    fn show_wild(&mut self) -> Vec<Effect> {
        self.view = View::Hunt;
        self.searches = load_saved_searches(&self.paths.searches);
        self.selected.clear();
        self.refresh_results()
    }

    fn add_search(&mut self, mut criterion: SearchCriterion) -> Vec<Effect> {
        if self.view == View::Tames {
            tracing::debug!("searches cannot be added to the tamed view");
            return Vec::new();
        }
        let Some(species) = criterion.species_filter().map(str::to_string) else {
            tracing::debug!("ignoring saved search without a species");
            return Vec::new();
        };

        let highest = self
            .searches
            .iter()
            .filter(|existing| existing.group == criterion.group)
            .map(|existing| existing.order)
            .reduce(f64::max);
        if let Some(highest) = highest {
            criterion.order = highest + NEW_SEARCH_ORDER_GAP;
        }

        self.searches.push(criterion);
        self.save_searches();

        if self.loading || self.wild.is_loaded(&species) {
            return Vec::new();
        }
        self.loading = true;
        self.set_progress(format!("Loading {species}..."));
        vec![Effect::LoadSpecies(SpeciesRequest {
            target: self.target(),
            species: vec![(Partition::Wild, species)],
        })]
    }

    fn remove_search(&mut self, index: usize) -> Vec<Effect> {
        if self.view == View::Tames || index >= self.searches.len() {
            return Vec::new();
        }

        self.searches.remove(index);
        self.selected.retain(|selected| *selected != index);
        for selected in &mut self.selected {
            if *selected > index {
                *selected -= 1;
            }
        }

        self.save_searches();
        self.refresh_results()
    }

    fn edit_search(
        &mut self,
        index: usize,
        edit: impl FnOnce(&mut SearchCriterion),
    ) -> Vec<Effect> {
        let Some(criterion) = self.searches.get_mut(index) else {
            return Vec::new();
        };
        edit(criterion);
        self.save_searches();

        if self.selected.contains(&index) {
            self.refresh_results()
        } else {
            Vec::new()
        }
    }

    fn refresh_results(&mut self) -> Vec<Effect> {
        let criteria: Vec<SearchCriterion> = self
            .selected
            .iter()
            .filter_map(|index| self.searches.get(*index).cloned())
            .collect();

        self.results = if criteria.is_empty() {
            Vec::new()
        } else {
            evaluate(&criteria, self.records(self.view.partition()))
                .into_iter()
                .map(ResultRow::new)
                .collect()
        };

        vec![self.highlight_now()]
    }

    fn highlight_now(&self) -> Effect {
        Effect::ScheduleHighlight {
            text: self.search_text.clone(),
            window: HighlightWindow::Fast,
        }
    }

    fn watch_effect(&self) -> Effect {
        Effect::WatchSave {
            file: self.settings.save_file.clone(),
            quiet_window: self.settings.convert_delay(),
        }
    }

    fn target(&self) -> ConversionTarget {
        ConversionTarget::new(
            self.settings.save_file.clone(),
            self.settings.resolved_output_dir(),
        )
    }

    fn ensure_output_dir(&mut self) {
        match self.settings.ensure_output_dir() {
            Ok(true) => self.save_settings(),
            Ok(false) => {}
            Err(err) => tracing::warn!("output directory unavailable: {err}"),
        }
    }

    fn save_settings(&self) {
        if let Err(err) = self.settings.save(&self.paths.settings) {
            tracing::warn!("failed to save settings: {err}");
        }
    }

    /// Only the hunt list is persisted; the tamed list is rebuilt from the data.
    fn save_searches(&self) {
        if self.view == View::Hunt {
            persist_saved_searches(&self.paths.searches, &self.searches);
        }
    }

    /// Progress text never hides an unresolved failure.
    fn set_progress(&mut self, text: String) {
        if self.last_error.is_none() {
            tracing::info!(status = %text);
            self.status.text = text;
        }
    }

    fn set_status(&mut self, text: impl Into<String>, detail: impl Into<String>) {
        self.status = Status {
            text: text.into(),
            detail: detail.into(),
        };
        tracing::info!(status = %self.status.text, detail = %self.status.detail);
    }
}
