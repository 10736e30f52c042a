//! The tick loop: acquisition, conditioning, calibration and the scene.
//!
//! [`Session::tick`] runs once per frame. It drains the data source, pushes
//! every sample through the conditioner in arrival order, lets the threshold
//! controller observe the phase in force, publishes phase and threshold
//! changes, and finally advances the scene with the latest filtered sample.
//! A tick without new samples reuses the previous filtered value.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::{AppConfig, Mode, ThresholdSource};
use crate::error::ConfigError;
use crate::events::{EventController, ExportMeta, PhaseMeta, SessionEvent, ThresholdMeta};
use crate::export;
use crate::scene::{Flow, Input, RenderState, Scene, Tick};
use crate::signal::SignalConditioner;
use crate::source::{select_channel, DataSource};
use crate::threshold::ThresholdController;

pub struct Session<C: Clock> {
    clock: C,
    source: Box<dyn DataSource>,
    conditioner: SignalConditioner,
    controller: ThresholdController,
    scene: Scene,
    events: EventController,
    emg_channel: usize,
    last_filtered: Option<f64>,
    /// Threshold last announced on the event bus.
    published: Option<f64>,
    started_utc: DateTime<Utc>,
    finished: bool,
}

impl<C: Clock> Session<C> {
    /// Validate `config`, build the scene for its mode and start acquisition.
    pub fn new(
        config: &AppConfig,
        source: Box<dyn DataSource>,
        clock: C,
        events: EventController,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let conditioner = SignalConditioner::new(&config.filter)?;
        let scene = Scene::for_mode(config.mode, config);
        Ok(Self::with_scene(config, scene, conditioner, source, clock, events))
    }

    /// Like [`new`](Self::new) with a prebuilt scene, e.g. a game on a fixed level.
    pub fn with_scene(
        config: &AppConfig,
        scene: Scene,
        conditioner: SignalConditioner,
        mut source: Box<dyn DataSource>,
        clock: C,
        events: EventController,
    ) -> Self {
        let now = clock.now();
        let controller = match config.threshold.source {
            ThresholdSource::Adaptive => ThresholdController::adaptive(),
            ThresholdSource::Fixed => ThresholdController::fixed(config.threshold.fixed),
        };
        source.start(now);
        info!(
            mode = %scene.mode(),
            fs = source.sample_rate(),
            channels = source.channel_count(),
            "session ready"
        );
        Self {
            clock,
            source,
            conditioner,
            controller,
            scene,
            events,
            emg_channel: config.acquisition.emg_channel,
            last_filtered: None,
            published: None,
            started_utc: Utc::now(),
            finished: false,
        }
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    pub fn tick(&mut self) -> RenderState {
        let now = self.clock.now();

        let frames = self.source.poll(now);
        for sample in select_channel(&frames, self.emg_channel) {
            self.last_filtered = Some(self.conditioner.apply(sample));
        }

        let info = self.scene.phase(now);
        let update = self.controller.update(info.phase, &mut self.conditioner);
        if let Some(t) = update.transition {
            self.events.emit(SessionEvent::phase_changed(
                PhaseMeta {
                    from: t.from,
                    to: t.to,
                    seconds_left: info.seconds_left,
                },
                now,
            ));
        }
        let threshold = self.controller.threshold();
        if let Some(value) = threshold.filter(|_| threshold != self.published) {
            let baseline = update.threshold.and(self.conditioner.baseline());
            self.events.emit(SessionEvent::threshold_changed(
                ThresholdMeta {
                    value,
                    mean: baseline.map(|b| b.mean),
                    std: baseline.map(|b| b.std),
                },
                now,
            ));
            self.published = threshold;
        }

        let tick = Tick {
            now,
            threshold,
            events: &self.events,
        };
        self.scene.draw(&tick, self.last_filtered)
    }

    pub fn handle_input(&mut self, input: Input) -> Flow {
        let now = self.clock.now();
        self.scene.handle_input(input, now, &self.events)
    }

    /// Stop the scene and the source, and write the recorded traces into
    /// `dir`. Returns the files written. Safe to call more than once.
    pub fn finish(&mut self, dir: &Path) -> Vec<PathBuf> {
        if self.finished {
            return Vec::new();
        }
        self.finished = true;
        let now = self.clock.now();
        self.scene.stop(now, &self.events);
        self.source.stop();

        let mut written = Vec::new();
        let stem = self.stem();
        let dropped = self.conditioner.output().first_index();
        if dropped > 0 {
            warn!(
                dropped,
                retained = self.conditioner.output().retained(),
                dropped_secs = dropped as f64 / self.conditioner.sampling_frequency(),
                "recording exceeds the history retention, oldest samples are not exported"
            );
        }
        let csv = export::session_path(dir, &stem, ".csv");
        match export::save_traces_csv(&csv, &self.conditioner) {
            Ok(()) => {
                info!(path = %csv.display(), samples = self.conditioner.output().len(), "traces saved");
                self.events.emit(SessionEvent::exported(
                    ExportMeta {
                        format: "csv".into(),
                        path: csv.clone(),
                        dropped,
                    },
                    now,
                ));
                written.push(csv);
            }
            Err(e) => warn!(path = %csv.display(), error = %e, "saving traces failed"),
        }

        #[cfg(feature = "parquet")]
        {
            let pq = export::session_path(dir, &stem, ".parquet");
            match export::save_traces_parquet(&pq, &self.conditioner) {
                Ok(()) => {
                    self.events.emit(SessionEvent::exported(
                        ExportMeta {
                            format: "parquet".into(),
                            path: pq.clone(),
                            dropped,
                        },
                        now,
                    ));
                    written.push(pq);
                }
                Err(e) => warn!(path = %pq.display(), error = %e, "saving parquet failed"),
            }
        }

        self.events.flush();
        written
    }

    /// `<UTC start>_<mode>`, shared by every output of this session.
    pub fn stem(&self) -> String {
        export::session_stem(self.started_utc, self.mode())
    }

    pub fn mode(&self) -> Mode {
        self.scene.mode()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn conditioner(&self) -> &SignalConditioner {
        &self.conditioner
    }

    pub fn threshold(&self) -> Option<f64> {
        self.controller.threshold()
    }

    pub fn last_filtered(&self) -> Option<f64> {
        self.last_filtered
    }

    pub fn events(&self) -> &EventController {
        &self.events
    }
}
