use larkcore_config::{marker, ConfigError};
use larkcore_index::{ConversionTarget, Converter, IndexError, Partition, PartitionRecords};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForceFlags {
    pub wild: bool,
    pub tamed: bool,
}

impl ForceFlags {
    pub fn arm_all(&mut self) {
        self.wild = true;
        self.tamed = true;
    }

    pub fn get(&self, partition: Partition) -> bool {
        match partition {
            Partition::Wild => self.wild,
            Partition::Tamed => self.tamed,
        }
    }

    pub fn set(&mut self, partition: Partition, value: bool) {
        match partition {
            Partition::Wild => self.wild = value,
            Partition::Tamed => self.tamed = value,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Convert(#[from] IndexError),
    #[error("failed to record the converted save: {0}")]
    Marker(#[from] ConfigError),
}

#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub target: ConversionTarget,
    pub force: bool,
    pub armed: ForceFlags,
}

#[derive(Debug)]
pub struct ConversionOutcome {
    /// The flags the request carried; unattempted partitions get them back.
    pub armed: ForceFlags,
    pub attempted: Vec<Partition>,
    pub converted: Vec<(Partition, PartitionRecords)>,
    /// Wild and tamed species counts.
    pub result: Result<(usize, usize), PipelineError>,
}

/// Converts wild, then tamed, then records the source in the marker.
///
/// Stops at the first failure. Partitions converted before the failure are
/// still returned so the caller keeps them.
pub fn run_conversion(converter: &dyn Converter, request: &ConversionRequest) -> ConversionOutcome {
    let mut attempted = Vec::new();
    let mut converted = Vec::new();
    let result = convert_partitions(converter, request, &mut attempted, &mut converted);

    match &result {
        Ok((wild, tamed)) => tracing::info!(wild, tamed, "save conversion completed"),
        Err(err) => tracing::error!("save conversion failed: {err}"),
    }

    ConversionOutcome {
        armed: request.armed,
        attempted,
        converted,
        result,
    }
}

fn convert_partitions(
    converter: &dyn Converter,
    request: &ConversionRequest,
    attempted: &mut Vec<Partition>,
    converted: &mut Vec<(Partition, PartitionRecords)>,
) -> Result<(usize, usize), PipelineError> {
    let mut counts = [0usize; 2];

    for (slot, partition) in Partition::ALL.into_iter().enumerate() {
        let force = request.force || request.armed.get(partition);
        attempted.push(partition);

        let records = converter.convert(partition, force, &request.target)?;
        counts[slot] = records.number_of_species();
        converted.push((partition, records));
    }

    marker::persist_last_source(&request.target.output_dir, &request.target.save_file)?;
    Ok((counts[0], counts[1]))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::{HashMap, HashSet};
    use std::path::Path;
    use std::sync::Mutex;

    use larkcore_index::Dino;

    use super::*;

    /// In-memory converter that records every call.
    #[derive(Default)]
    pub(crate) struct FakeConverter {
        pub(crate) species: HashMap<Partition, Vec<(String, Vec<Dino>)>>,
        pub(crate) failing: HashSet<Partition>,
        pub(crate) calls: Mutex<Vec<(Partition, bool)>>,
        pub(crate) loads: Mutex<Vec<(Partition, String)>>,
    }

    impl FakeConverter {
        pub(crate) fn with_species(mut self, partition: Partition, name: &str, dinos: Vec<Dino>) -> Self {
            self.species
                .entry(partition)
                .or_default()
                .push((name.to_string(), dinos));
            self
        }

        pub(crate) fn failing(mut self, partition: Partition) -> Self {
            self.failing.insert(partition);
            self
        }

        pub(crate) fn calls(&self) -> Vec<(Partition, bool)> {
            self.calls.lock().unwrap().clone()
        }

        pub(crate) fn loads(&self) -> Vec<(Partition, String)> {
            self.loads.lock().unwrap().clone()
        }
    }

    impl Converter for FakeConverter {
        fn convert(
            &self,
            partition: Partition,
            force: bool,
            _target: &ConversionTarget,
        ) -> Result<PartitionRecords, IndexError> {
            self.calls.lock().unwrap().push((partition, force));
            if self.failing.contains(&partition) {
                return Err(IndexError::Conversion {
                    partition,
                    message: "tool crashed".to_string(),
                });
            }

            let names = self
                .species
                .get(&partition)
                .map(|list| list.iter().map(|(name, _)| name.clone()).collect())
                .unwrap_or_default();
            Ok(PartitionRecords::new(names))
        }

        fn load_species(
            &self,
            partition: Partition,
            species: &str,
            _target: &ConversionTarget,
        ) -> Result<Option<Vec<Dino>>, IndexError> {
            self.loads
                .lock()
                .unwrap()
                .push((partition, species.to_string()));
            Ok(self.species.get(&partition).and_then(|list| {
                list.iter()
                    .find(|(name, _)| name == species)
                    .map(|(_, dinos)| dinos.clone())
            }))
        }
    }

    fn request(root: &Path, force: bool, armed: ForceFlags) -> ConversionRequest {
        ConversionRequest {
            target: ConversionTarget::new(root.join("TheIsland.ark"), root.join("out")),
            force,
            armed,
        }
    }

    #[test]
    fn converts_wild_then_tamed_and_writes_marker() {
        let root = tempfile::tempdir().unwrap();
        let converter = FakeConverter::default()
            .with_species(Partition::Wild, "Rex", Vec::new())
            .with_species(Partition::Wild, "Dodo", Vec::new())
            .with_species(Partition::Tamed, "Rex", Vec::new());
        let request = request(root.path(), false, ForceFlags::default());

        let outcome = run_conversion(&converter, &request);

        assert_eq!(outcome.result.unwrap(), (2, 1));
        assert_eq!(
            converter.calls(),
            [(Partition::Wild, false), (Partition::Tamed, false)]
        );
        assert!(!marker::is_stale(
            &request.target.output_dir,
            &request.target.save_file
        ));
    }

    #[test]
    fn wild_failure_skips_tamed_and_marker() {
        let root = tempfile::tempdir().unwrap();
        let converter = FakeConverter::default().failing(Partition::Wild);
        let request = request(root.path(), false, ForceFlags::default());

        let outcome = run_conversion(&converter, &request);

        assert!(matches!(outcome.result, Err(PipelineError::Convert(_))));
        assert_eq!(converter.calls(), [(Partition::Wild, false)]);
        assert_eq!(outcome.attempted, [Partition::Wild]);
        assert!(outcome.converted.is_empty());
        assert!(marker::is_stale(
            &request.target.output_dir,
            &request.target.save_file
        ));
    }

    #[test]
    fn tamed_failure_keeps_converted_wild_records() {
        let root = tempfile::tempdir().unwrap();
        let converter = FakeConverter::default()
            .with_species(Partition::Wild, "Rex", Vec::new())
            .failing(Partition::Tamed);
        let request = request(root.path(), false, ForceFlags::default());

        let outcome = run_conversion(&converter, &request);

        assert!(outcome.result.is_err());
        assert_eq!(outcome.converted.len(), 1);
        assert_eq!(outcome.converted[0].0, Partition::Wild);
    }

    #[test]
    fn armed_flags_force_their_partition() {
        let root = tempfile::tempdir().unwrap();
        let converter = FakeConverter::default();
        let armed = ForceFlags {
            wild: false,
            tamed: true,
        };

        run_conversion(&converter, &request(root.path(), false, armed));
        run_conversion(&converter, &request(root.path(), true, ForceFlags::default()));

        assert_eq!(
            converter.calls(),
            [
                (Partition::Wild, false),
                (Partition::Tamed, true),
                (Partition::Wild, true),
                (Partition::Tamed, true),
            ]
        );
    }
}
