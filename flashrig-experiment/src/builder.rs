use crate::config::{SessionConfig, StimulationKind};
use flashrig_core::{FlashGroups, LayoutMode, Ring, Stimulus};
use rand::seq::IndexedRandom;
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("trainer mode requires a non-empty image catalog")]
    EmptyCatalog,
}

/// Build the session's stimulus set and flash groups from the layout
/// config. Positions, sizes and groups come from the geometry; trainer mode
/// draws a random category per stimulus (with replacement) from the catalog.
pub fn build<R: Rng>(
    config: &SessionConfig,
    rng: &mut R,
) -> Result<(Vec<Stimulus>, FlashGroups), BuildError> {
    let (positions, mut groups) = match config.layout {
        LayoutMode::Radial => (config.radial.positions(), config.radial.groups()),
        LayoutMode::Grid => (config.grid.positions(), config.grid.groups()),
    };

    let mut stimuli = Vec::new();
    for (index, position) in positions
        .into_iter()
        .enumerate()
        .take(config.stimulus_names.len())
    {
        let label = config.stimulus_names[index].clone();
        let size = match config.layout {
            LayoutMode::Radial => config.radial.size_for(index),
            LayoutMode::Grid => config.grid.size,
        };

        let mut stimulus = match config.stimulation {
            StimulationKind::Speller => Stimulus::text(index, label, position, size),
            StimulationKind::Trainer => {
                let entry = config
                    .image_catalog
                    .choose(rng)
                    .ok_or(BuildError::EmptyCatalog)?;
                Stimulus::image(
                    index,
                    label,
                    entry.path.clone(),
                    entry.category.clone(),
                    position,
                    size,
                )
            }
        };

        // Ring selection only narrows the radial layout.
        if config.layout == LayoutMode::Radial {
            let ring = Ring::of_index(index, config.radial.slots());
            stimulus.visible = config.rings.contains(ring);
        }

        stimuli.push(stimulus);
    }

    groups.retain_members(stimuli.len());
    Ok((stimuli, groups))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashrig_core::RingSelection;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn ring_selection_controls_visibility() {
        let config = SessionConfig {
            rings: RingSelection::Rings(vec![Ring::Outer, Ring::Inner]),
            ..SessionConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let (stimuli, _) = build(&config, &mut rng).unwrap();

        assert_eq!(stimuli.len(), 27);
        assert!(stimuli[0].visible); // outer
        assert!(!stimuli[9].visible); // middle
        assert!(stimuli[18].visible); // inner
    }

    #[test]
    fn radial_sizes_follow_ring_tiers() {
        let config = SessionConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let (stimuli, _) = build(&config, &mut rng).unwrap();

        assert_eq!(stimuli[0].size, config.radial.size_tiers[0]);
        assert_eq!(stimuli[9].size, config.radial.size_tiers[1]);
        assert_eq!(stimuli[18].size, config.radial.size_tiers[2]);
    }

    #[test]
    fn trainer_mode_assigns_catalog_categories() {
        let config = SessionConfig {
            stimulation: StimulationKind::Trainer,
            ..SessionConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(42);
        let (stimuli, _) = build(&config, &mut rng).unwrap();

        let categories: Vec<&str> = config
            .image_catalog
            .iter()
            .map(|e| e.category.as_str())
            .collect();
        for stimulus in &stimuli {
            let category = stimulus.kind.category().unwrap();
            assert!(categories.contains(&category));
        }
    }

    #[test]
    fn trainer_mode_with_empty_catalog_fails() {
        let config = SessionConfig {
            stimulation: StimulationKind::Trainer,
            image_catalog: Vec::new(),
            ..SessionConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            build(&config, &mut rng),
            Err(BuildError::EmptyCatalog)
        ));
    }

    #[test]
    fn grid_groups_skip_cells_without_stimuli() {
        // 5x6 grid, 27 names: the last row has three stimuli.
        let config = SessionConfig {
            layout: LayoutMode::Grid,
            ..SessionConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let (stimuli, groups) = build(&config, &mut rng).unwrap();

        assert_eq!(stimuli.len(), 27);
        for (_, members) in groups.iter() {
            assert!(members.iter().all(|&i| i < stimuli.len()));
            assert!(!members.is_empty());
        }
        // last row kept its populated cells
        assert_eq!(groups.members(4), Some(&[24usize, 25, 26][..]));
    }
}
