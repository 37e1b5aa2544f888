//! Control Surface
//!
//! Builds the processing chain from config and hands out a cloneable
//! [`Controls`] handle that applies [`Command`]s straight to the shared
//! effect state. Control calls never go through the processing thread:
//! parameters, rotators, and the looper are safe to touch from anywhere.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use tracing::{debug, info};

use stomp_dsp::{
    ClipAlgorithm, Distortion, Filter, FilterControls, FilterKind, Looper, Parameter,
    ProcessorChain, Reverb, Rotator, Warp, WarpShape, MAX_CUTOFF,
};

use crate::config::{EffectKind, EngineConfig};
use crate::error::{EngineError, EngineResult};
use crate::message::{Command, EffectStatus, Event, Step};

#[derive(Default)]
struct Handles {
    amplification: Option<Arc<Parameter>>,
    clip_algorithms: Option<Arc<Rotator<ClipAlgorithm>>>,
    decay: Option<Arc<Parameter>>,
    filter: Option<Arc<FilterControls>>,
    warp_shapes: Option<Arc<Rotator<WarpShape>>>,
    looper: Option<Arc<Looper>>,
}

/// Build the configured chain and the control handle for it
pub fn build_chain(
    config: &EngineConfig,
    events: Sender<Event>,
    is_running: Arc<AtomicBool>,
) -> EngineResult<(ProcessorChain, Controls)> {
    config.validate()?;

    let mut chain = ProcessorChain::new();
    let mut handles = Handles::default();

    for effect in &config.chain {
        match effect {
            EffectKind::Distortion => {
                let distortion = Distortion::new(ClipAlgorithm::catalog())?;
                handles.amplification = Some(distortion.amplification());
                handles.clip_algorithms = Some(distortion.algorithms());
                chain.add(distortion);
            }
            EffectKind::Reverb => {
                let reverb = Reverb::with_delays_ms(
                    config.reverb.initial_decay,
                    &config.reverb.delays_ms,
                    config.sample_rate,
                )?;
                handles.decay = Some(reverb.decay());
                chain.add(reverb);
            }
            EffectKind::Filter => {
                let filter = Filter::new(
                    config.sample_rate as f32,
                    config.filter.window_size,
                    FilterKind::catalog(),
                )?;
                handles.filter = Some(filter.controls());
                chain.add(filter);
            }
            EffectKind::Warp => {
                let warp = Warp::new(WarpShape::catalog())?;
                handles.warp_shapes = Some(warp.shapes());
                chain.add(warp);
            }
            EffectKind::Loop => {
                let looper = Arc::new(Looper::new(config.loop_amplification)?);
                handles.looper = Some(Arc::clone(&looper));
                chain.add(looper);
            }
        }
        debug!("Added {} to chain", effect.name());
    }

    let controls = Controls {
        handles: Arc::new(handles),
        config: Arc::new(config.clone()),
        events,
        is_running,
    };
    Ok((chain, controls))
}

/// Thread-safe handle for driving effect controls
#[derive(Clone)]
pub struct Controls {
    handles: Arc<Handles>,
    config: Arc<EngineConfig>,
    events: Sender<Event>,
    is_running: Arc<AtomicBool>,
}

impl Controls {
    /// Apply a command and publish the resulting event
    pub fn execute(&self, command: Command) -> EngineResult<Event> {
        let event = self.apply(command)?;
        // The display may have gone away; processing carries on regardless
        let _ = self.events.send(event.clone());
        Ok(event)
    }

    fn apply(&self, command: Command) -> EngineResult<Event> {
        match command {
            Command::NextAlgorithm(effect) => self.rotate(effect, true),
            Command::PrevAlgorithm(effect) => self.rotate(effect, false),

            Command::SetDecay(value) => {
                let decay = self.decay()?.set_now(value);
                info!("Set decay to {:.3}", decay);
                Ok(Event::DecayChanged { decay })
            }
            Command::StepDecay(step) => {
                let delta = match step {
                    Step::Up => self.config.reverb.decay_step,
                    Step::Down => -self.config.reverb.decay_step,
                };
                let decay = self.decay()?.adjust_now(|d| d + delta);
                let adjustment = if step == Step::Up { "Increased" } else { "Decreased" };
                info!("{} decay to {:.3}", adjustment, decay);
                Ok(Event::DecayChanged { decay })
            }
            Command::RampDecay { target, steps } => {
                let decay = self.decay()?.set_ramped(target, steps)?;
                info!("Ramping decay to {:.3} over {} samples", decay, steps);
                Ok(Event::DecayChanged { decay })
            }

            Command::SetAmplification(value) => {
                let factor = self.amplification()?.set_now(value);
                info!("Set distortion factor to {:.2}", factor);
                Ok(Event::AmplificationChanged { factor })
            }
            Command::ScaleAmplification(step) => {
                let scale = self.config.distortion.scale_factor;
                let steps = self.config.distortion.ramp_steps;
                let factor = match step {
                    Step::Up => self.amplification()?.adjust_ramped(|f| f * scale, steps)?,
                    Step::Down => self.amplification()?.adjust_ramped(|f| f / scale, steps)?,
                };
                let adjustment = if step == Step::Up { "Increasing" } else { "Decreasing" };
                info!("{} distortion factor to {:.2}", adjustment, factor);
                Ok(Event::AmplificationChanged { factor })
            }

            Command::SetFilterMin(min) => {
                let filter = self.filter()?;
                let min = filter.set_min(min);
                info!("Set minimum frequency to {:.2}", min);
                Ok(self.filter_event(filter))
            }
            Command::SetFilterMax(max) => {
                let filter = self.filter()?;
                let max = filter.set_max(max);
                info!("Set maximum frequency to {:.2}", max);
                Ok(self.filter_event(filter))
            }
            Command::ScaleFilterMin(step) => {
                let filter = self.filter()?;
                let bounds = filter.bounds();
                let scale = self.config.filter.scale_factor;
                let floor = self.config.filter.min_cutoff;
                let min = match step {
                    Step::Up => (bounds.min.max(floor) * scale).min(bounds.max),
                    Step::Down => (bounds.min / scale).max(floor),
                };
                let min = filter.set_min(min);
                let adjustment = if step == Step::Up { "Increased" } else { "Decreased" };
                info!("{} minimum frequency to {:.2}", adjustment, min);
                Ok(self.filter_event(filter))
            }
            Command::ScaleFilterMax(step) => {
                let filter = self.filter()?;
                let bounds = filter.bounds();
                let scale = self.config.filter.scale_factor;
                let max = match step {
                    Step::Up => (bounds.max * scale).max(bounds.min).min(MAX_CUTOFF),
                    Step::Down => (bounds.max / scale).max(bounds.min),
                };
                let max = filter.set_max(max);
                let adjustment = if step == Step::Up { "Increased" } else { "Decreased" };
                info!("{} maximum frequency to {:.2}", adjustment, max);
                Ok(self.filter_event(filter))
            }

            Command::Loop => {
                let state = self.looper()?.toggle();
                Ok(Event::LoopStateChanged {
                    state: state.to_string(),
                })
            }
            Command::ClearLoop => {
                let state = self.looper()?.clear();
                Ok(Event::LoopStateChanged {
                    state: state.to_string(),
                })
            }

            Command::RequestState => Ok(self.snapshot()),
        }
    }

    fn rotate(&self, effect: EffectKind, forward: bool) -> EngineResult<Event> {
        let algorithm = match effect {
            EffectKind::Distortion => {
                let rotator = self.handle(&self.handles.clip_algorithms, effect)?;
                let clip = if forward { rotator.next() } else { rotator.prev() };
                clip.name()
            }
            EffectKind::Filter => {
                let filter = self.filter()?;
                let name = if forward {
                    filter.next_algorithm()
                } else {
                    filter.prev_algorithm()
                };
                name.to_string()
            }
            EffectKind::Warp => {
                let rotator = self.handle(&self.handles.warp_shapes, effect)?;
                let shape = if forward { rotator.next() } else { rotator.prev() };
                shape.name().to_string()
            }
            EffectKind::Reverb | EffectKind::Loop => {
                return Err(EngineError::NoAlgorithms(effect.name()));
            }
        };
        info!("Switched {} algorithm to {}", effect.name(), algorithm);
        Ok(Event::AlgorithmChanged { effect, algorithm })
    }

    fn filter_event(&self, filter: &FilterControls) -> Event {
        let bounds = filter.bounds();
        Event::FilterBoundsChanged {
            min: bounds.min,
            max: bounds.max,
        }
    }

    fn handle<'a, T>(&self, slot: &'a Option<Arc<T>>, effect: EffectKind) -> EngineResult<&'a Arc<T>> {
        slot.as_ref().ok_or(EngineError::EffectNotLoaded(effect.name()))
    }

    fn decay(&self) -> EngineResult<&Arc<Parameter>> {
        self.handle(&self.handles.decay, EffectKind::Reverb)
    }

    fn amplification(&self) -> EngineResult<&Arc<Parameter>> {
        self.handle(&self.handles.amplification, EffectKind::Distortion)
    }

    fn filter(&self) -> EngineResult<&Arc<FilterControls>> {
        self.handle(&self.handles.filter, EffectKind::Filter)
    }

    fn looper(&self) -> EngineResult<&Arc<Looper>> {
        self.handle(&self.handles.looper, EffectKind::Loop)
    }

    /// Name of an effect's active algorithm, if it has one and is loaded
    pub fn current_algorithm(&self, effect: EffectKind) -> Option<String> {
        match effect {
            EffectKind::Distortion => self
                .handles
                .clip_algorithms
                .as_ref()
                .map(|r| r.current().name()),
            EffectKind::Filter => self
                .handles
                .filter
                .as_ref()
                .map(|f| f.current_algorithm().to_string()),
            EffectKind::Warp => self
                .handles
                .warp_shapes
                .as_ref()
                .map(|r| r.current().name().to_string()),
            EffectKind::Reverb | EffectKind::Loop => None,
        }
    }

    /// Current state of every loaded effect
    pub fn snapshot(&self) -> Event {
        let effects = self
            .config
            .chain
            .iter()
            .map(|&effect| EffectStatus {
                effect,
                algorithm: self.current_algorithm(effect),
            })
            .collect();

        Event::StateUpdate {
            is_running: self.is_running.load(Ordering::SeqCst),
            effects,
            decay: self.handles.decay.as_ref().map(|d| d.goal()),
            amplification: self.handles.amplification.as_ref().map(|a| a.goal()),
            filter_bounds: self.handles.filter.as_ref().map(|f| {
                let bounds = f.bounds();
                (bounds.min, bounds.max)
            }),
            loop_state: self.handles.looper.as_ref().map(|l| l.state().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn controls_for(chain: Vec<EffectKind>) -> (ProcessorChain, Controls, crossbeam_channel::Receiver<Event>) {
        let (tx, rx) = unbounded();
        let config = EngineConfig {
            chain,
            ..Default::default()
        };
        let (processors, controls) =
            build_chain(&config, tx, Arc::new(AtomicBool::new(false))).unwrap();
        (processors, controls, rx)
    }

    #[test]
    fn test_build_chain_order() {
        let (chain, _, _) = controls_for(vec![
            EffectKind::Warp,
            EffectKind::Distortion,
            EffectKind::Loop,
        ]);
        assert_eq!(chain.names(), vec!["Warp", "Distortion", "Loop"]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let (tx, _rx) = unbounded();
        let config = EngineConfig {
            loop_amplification: 2.0,
            ..Default::default()
        };
        let result = build_chain(&config, tx, Arc::new(AtomicBool::new(false)));
        assert!(matches!(result, Err(EngineError::DspError(_))));
    }

    #[test]
    fn test_missing_effect() {
        let (_, controls, _) = controls_for(vec![EffectKind::Reverb]);
        assert!(matches!(
            controls.execute(Command::Loop),
            Err(EngineError::EffectNotLoaded("Loop"))
        ));
        assert!(matches!(
            controls.execute(Command::NextAlgorithm(EffectKind::Reverb)),
            Err(EngineError::NoAlgorithms("Reverb"))
        ));
        assert!(matches!(
            controls.execute(Command::PrevAlgorithm(EffectKind::Loop)),
            Err(EngineError::NoAlgorithms("Loop"))
        ));
    }

    #[test]
    fn test_rotation_publishes_event() {
        let (_, controls, rx) = controls_for(vec![EffectKind::Distortion, EffectKind::Warp]);
        controls
            .execute(Command::NextAlgorithm(EffectKind::Distortion))
            .unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            Event::AlgorithmChanged {
                effect: EffectKind::Distortion,
                algorithm: "Square clip (amplitude 0.05)".into(),
            }
        );

        let event = controls
            .execute(Command::PrevAlgorithm(EffectKind::Warp))
            .unwrap();
        assert!(matches!(event, Event::AlgorithmChanged { ref algorithm, .. } if algorithm == "Semi-circle"));
    }

    #[test]
    fn test_decay_steps_and_clamps() {
        let (_, controls, _) = controls_for(vec![EffectKind::Reverb]);
        let event = controls.execute(Command::StepDecay(Step::Up)).unwrap();
        match event {
            Event::DecayChanged { decay } => assert!((decay - 0.91).abs() < 1e-9),
            other => panic!("unexpected {:?}", other),
        }
        let event = controls.execute(Command::SetDecay(5.0)).unwrap();
        assert_eq!(event, Event::DecayChanged { decay: 0.999 });
        assert!(controls
            .execute(Command::RampDecay { target: 0.5, steps: 0 })
            .is_err());
    }

    #[test]
    fn test_amplification_scales_goal() {
        let (_, controls, _) = controls_for(vec![EffectKind::Distortion]);
        let up = controls.execute(Command::ScaleAmplification(Step::Up)).unwrap();
        let up_again = controls.execute(Command::ScaleAmplification(Step::Up)).unwrap();
        match (up, up_again) {
            (
                Event::AmplificationChanged { factor: first },
                Event::AmplificationChanged { factor: second },
            ) => {
                assert!((first - 1.1).abs() < 1e-9);
                // Scales the goal, not the value still ramping
                assert!((second - 1.21).abs() < 1e-9);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_filter_scaling() {
        let (_, controls, _) = controls_for(vec![EffectKind::Filter]);
        let event = controls.execute(Command::ScaleFilterMin(Step::Up)).unwrap();
        match event {
            Event::FilterBoundsChanged { min, max } => {
                assert!((min - 0.11).abs() < 1e-4);
                assert_eq!(max, MAX_CUTOFF);
            }
            other => panic!("unexpected {:?}", other),
        }

        controls.execute(Command::SetFilterMax(1000.0)).unwrap();
        let event = controls.execute(Command::ScaleFilterMax(Step::Up)).unwrap();
        assert!(matches!(event, Event::FilterBoundsChanged { max, .. } if (max - 1100.0).abs() < 1e-2));

        // Max never drops below min
        controls.execute(Command::SetFilterMin(1090.0)).unwrap();
        let event = controls.execute(Command::ScaleFilterMax(Step::Down)).unwrap();
        assert!(matches!(event, Event::FilterBoundsChanged { max, .. } if max == 1090.0));
    }

    #[test]
    fn test_loop_commands() {
        let (mut chain, controls, _) = controls_for(vec![EffectKind::Loop]);
        assert_eq!(
            controls.execute(Command::Loop).unwrap(),
            Event::LoopStateChanged {
                state: "Recording first loop".into()
            }
        );
        chain.process(vec![10, 20]).unwrap();
        controls.execute(Command::Loop).unwrap();
        assert_eq!(chain.process(vec![1]).unwrap(), vec![23]);
        assert_eq!(
            controls.execute(Command::ClearLoop).unwrap(),
            Event::LoopStateChanged {
                state: "Saved loop".into()
            }
        );
    }

    #[test]
    fn test_snapshot() {
        let (_, controls, _) = controls_for(vec![EffectKind::Distortion, EffectKind::Loop]);
        match controls.execute(Command::RequestState).unwrap() {
            Event::StateUpdate {
                is_running,
                effects,
                decay,
                amplification,
                loop_state,
                ..
            } => {
                assert!(!is_running);
                assert_eq!(effects.len(), 2);
                assert_eq!(effects[0].algorithm.as_deref(), Some("None"));
                assert_eq!(effects[1].algorithm, None);
                assert_eq!(decay, None);
                assert_eq!(amplification, Some(1.0));
                assert_eq!(loop_state.as_deref(), Some("Idle"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
