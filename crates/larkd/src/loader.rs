use larkcore_index::{ConversionTarget, Converter, Dino, Partition, PartitionRecords};

#[derive(Debug, Clone)]
pub struct SpeciesRequest {
    pub target: ConversionTarget,
    pub species: Vec<(Partition, String)>,
}

#[derive(Debug, Default)]
pub struct SpeciesBatch {
    pub loaded: Vec<(Partition, String, Vec<Dino>)>,
    pub failures: Vec<(Partition, String, String)>,
}

pub fn pending_species(partition: Partition, records: &PartitionRecords) -> Vec<(Partition, String)> {
    records
        .unloaded_species()
        .map(|species| (partition, species.to_string()))
        .collect()
}

/// Loads every requested species in order.
///
/// Species the converter does not know are skipped; failures are collected
/// so one broken species file does not hide the rest.
pub fn load_species(converter: &dyn Converter, request: &SpeciesRequest) -> SpeciesBatch {
    let mut batch = SpeciesBatch::default();

    for (partition, species) in &request.species {
        tracing::debug!(%partition, %species, "loading species");
        match converter.load_species(*partition, species, &request.target) {
            Ok(Some(dinos)) => batch.loaded.push((*partition, species.clone(), dinos)),
            Ok(None) => tracing::debug!(%partition, %species, "no records for species"),
            Err(err) => {
                tracing::warn!(%partition, %species, "failed to load species: {err}");
                batch
                    .failures
                    .push((*partition, species.clone(), err.to_string()));
            }
        }
    }

    batch
}
