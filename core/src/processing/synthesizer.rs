use crate::distribution::{Emission, InstanceBinding, MagneticFieldStrength};
use crate::math::{MatrixHelper, Vector3f};
use crate::pipeline::params::MagParams;
use crate::prelude::{elapsed_ms, ACCUMULATE_WEIGHT, STORE_INTERVAL_MS};
use crate::processing::correction::CorrectionMatrixCache;
use crate::processing::delay_line::{DelayLine, Sample};
use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Intermediate results of one synthesis pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthesisOutcome {
    pub noisy: Vector3f,
    pub corrected: Vector3f,
    pub stored: bool,
    pub delay_fallback: bool,
}

/// Turns a truth field into delayed, noisy, miscalibrated sensor readings.
pub struct SampleSynthesizer {
    delay_line: DelayLine,
    correction: CorrectionMatrixCache,
    rng: StdRng,
    last_store_time: Option<u32>,
}

impl SampleSynthesizer {
    pub fn new(seed: u64) -> Self {
        Self {
            delay_line: DelayLine::new(),
            correction: CorrectionMatrixCache::new(),
            rng: StdRng::seed_from_u64(seed),
            last_store_time: None,
        }
    }

    pub fn delay_line(&self) -> &DelayLine {
        &self.delay_line
    }

    pub fn correction(&self) -> &CorrectionMatrixCache {
        &self.correction
    }

    pub fn last_store_time(&self) -> Option<u32> {
        self.last_store_time
    }

    fn random_vector(&mut self) -> Vector3f {
        Vector3f::new(
            self.rng.gen_range(-1.0..=1.0),
            self.rng.gen_range(-1.0..=1.0),
            self.rng.gen_range(-1.0..=1.0),
        )
    }

    /// Noise, delay line, soft-iron correction and hard-iron offset for the
    /// field common to every instance.
    pub fn synthesize(&mut self, now: u32, truth: Vector3f, params: &MagParams) -> SynthesisOutcome {
        let noisy = truth + self.random_vector() * params.noise;

        let store_due = self
            .last_store_time
            .map_or(true, |last| elapsed_ms(now, last) >= STORE_INTERVAL_MS);
        if store_due {
            self.last_store_time = Some(now);
            self.delay_line.store(Sample::new(now, noisy));
        }

        let delayed_time = now.wrapping_sub(params.delay_ms);
        let (delayed, delay_fallback) = match self.delay_line.retrieve(delayed_time) {
            Some(sample) => (sample.field, false),
            None => {
                debug!("no stored sample near t={}ms, using undelayed field", delayed_time);
                (noisy, true)
            }
        };

        let matrix = self.correction.get(params.diagonals, params.offdiagonals);
        let corrected = MatrixHelper::mul_vec(matrix.view(), delayed) - params.offsets;

        SynthesisOutcome {
            noisy,
            corrected,
            stored: store_due,
            delay_fallback,
        }
    }

    /// Misalignment and gain error applied to the primary in-process instance.
    pub fn primary_instance_field(corrected: Vector3f, params: &MagParams) -> Vector3f {
        let mut field = params.orientation.rotate_inverse(corrected);
        field = params.board_orientation.rotate(field);
        field * params.scaling
    }

    /// One emission per binding. Only the first in-process instance receives
    /// the rotation and scale treatment; bus nodes always carry the common
    /// corrected field, converted to gauss.
    pub fn emissions<'a>(
        corrected: Vector3f,
        params: &MagParams,
        bindings: &'a [InstanceBinding],
    ) -> Vec<Emission<'a>> {
        let mut primary_seen = false;
        bindings
            .iter()
            .map(|binding| match binding {
                InstanceBinding::Accumulate { instance } => {
                    let field = if primary_seen {
                        corrected
                    } else {
                        primary_seen = true;
                        Self::primary_instance_field(corrected, params)
                    };
                    Emission::Accumulate {
                        instance: *instance,
                        field,
                        weight: ACCUMULATE_WEIGHT,
                    }
                }
                InstanceBinding::BusNode { node, sensor_id } => Emission::Publish {
                    node: node.as_ref(),
                    sensor_id: *sensor_id,
                    field_ga: MagneticFieldStrength::from_milligauss(*sensor_id, corrected)
                        .magnetic_field_ga,
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::bus::{BusNode, RecordingTransport};
    use crate::math::Rotation;
    use std::sync::Arc;

    const TRUTH: Vector3f = Vector3f::new(200.0, 0.0, 400.0);

    #[test]
    fn clean_parameters_pass_truth_through() {
        let mut synth = SampleSynthesizer::new(7);
        let outcome = synth.synthesize(5_000, TRUTH, &MagParams::default());
        assert!(outcome.stored);
        assert!(!outcome.delay_fallback);
        assert_eq!(outcome.corrected, TRUTH);
    }

    #[test]
    fn missing_history_falls_back_to_noisy_field() {
        let mut synth = SampleSynthesizer::new(11);
        let params = MagParams {
            noise: 5.0,
            delay_ms: 50,
            ..MagParams::default()
        };
        synth.synthesize(5_000, TRUTH, &params);

        // second call inside the store gate, asking for a time far from any sample
        let far = MagParams {
            delay_ms: 3_000,
            ..params.clone()
        };
        let outcome = synth.synthesize(5_005, TRUTH, &far);
        assert!(!outcome.stored);
        assert!(outcome.delay_fallback);
        assert_eq!(outcome.corrected, outcome.noisy);
    }

    #[test]
    fn delayed_field_comes_from_history() {
        let mut synth = SampleSynthesizer::new(3);
        let params = MagParams {
            delay_ms: 50,
            ..MagParams::default()
        };
        for step in 0..10u32 {
            let truth = Vector3f::new(step as f32, 0.0, 0.0);
            synth.synthesize(1_000 + step * 10, truth, &params);
        }
        // delayed to t=1050, which was stored with x=5
        let outcome = synth.synthesize(1_100, Vector3f::new(10.0, 0.0, 0.0), &params);
        assert_eq!(outcome.corrected, Vector3f::new(5.0, 0.0, 0.0));
        assert_eq!(synth.delay_line().len(), 11);
    }

    #[test]
    fn hard_iron_offset_is_subtracted_after_correction() {
        let mut synth = SampleSynthesizer::new(1);
        let params = MagParams {
            diagonals: Vector3f::new(2.0, 2.0, 2.0),
            offsets: Vector3f::new(10.0, 0.0, -10.0),
            ..MagParams::default()
        };
        let outcome = synth.synthesize(100, TRUTH, &params);
        assert_eq!(outcome.corrected, Vector3f::new(90.0, 0.0, 210.0));
    }

    #[test]
    fn only_first_accumulated_instance_is_rotated_and_scaled() {
        let (transport, log) = RecordingTransport::new();
        let node = Arc::new(BusNode::new(0, 125, transport));
        let bindings = vec![
            InstanceBinding::BusNode {
                node: node.clone(),
                sensor_id: 0,
            },
            InstanceBinding::Accumulate { instance: 0 },
            InstanceBinding::Accumulate { instance: 1 },
        ];
        let params = MagParams {
            orientation: Rotation::None,
            board_orientation: Rotation::Yaw90,
            scaling: 2.0,
            ..MagParams::default()
        };

        let emissions = SampleSynthesizer::emissions(TRUTH, &params, &bindings);
        assert_eq!(emissions.len(), 3);
        match &emissions[0] {
            Emission::Publish { sensor_id, field_ga, .. } => {
                assert_eq!(*sensor_id, 0);
                assert_eq!(*field_ga, [0.2, 0.0, 0.4]);
            }
            other => panic!("unexpected emission {:?}", other),
        }
        match &emissions[1] {
            Emission::Accumulate { instance, field, weight } => {
                assert_eq!(*instance, 0);
                assert_eq!(*weight, ACCUMULATE_WEIGHT);
                assert_eq!(*field, Vector3f::new(0.0, 400.0, 800.0));
            }
            other => panic!("unexpected emission {:?}", other),
        }
        match &emissions[2] {
            Emission::Accumulate { instance, field, .. } => {
                assert_eq!(*instance, 1);
                assert_eq!(*field, TRUTH);
            }
            other => panic!("unexpected emission {:?}", other),
        }
        assert!(log.messages().is_empty());
    }

    #[test]
    fn misalignment_is_undone_before_board_rotation() {
        let params = MagParams {
            orientation: Rotation::Yaw90,
            board_orientation: Rotation::Yaw90,
            ..MagParams::default()
        };
        let field = SampleSynthesizer::primary_instance_field(TRUTH, &params);
        assert_eq!(field, TRUTH);
    }
}
