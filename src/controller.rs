// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, Sender};
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, span, Instrument, Level};

use crate::region::PointerEvent;
use crate::sampler::Sampler;

pub mod keyboard;

/// Controller events that will trigger behavior in the sampler.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Plays the pad's trim region, cutting the pad if it is already sounding.
    Trigger(usize),

    /// Stops the pad. Does nothing if the pad is idle.
    Stop(usize),

    /// Stops every pad.
    StopAll,

    /// Shows the pad in the waveform editor.
    Select(usize),

    /// Sets the master volume (0.0 to 1.0).
    Volume(f64),

    /// Pointer input for the waveform editor.
    Pointer(PointerEvent),

    /// Resets the selected pad to its full length.
    Reset,

    /// Logs the state of every pad.
    Status,

    /// Shuts the controller down.
    Quit,
}

pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;
}

/// Drives a sampler from a driver's events.
pub struct Controller {
    handle: JoinHandle<()>,
}

impl Controller {
    /// Creates a new controller with the given driver.
    pub fn new(sampler: Arc<Mutex<Sampler>>, driver: Arc<dyn Driver>) -> Controller {
        Controller {
            handle: tokio::spawn(
                Controller::trigger_events(sampler, driver)
                    .instrument(span!(Level::INFO, "controller")),
            ),
        }
    }

    /// Join will block until the controller finishes.
    pub async fn join(&mut self) -> Result<(), JoinError> {
        (&mut self.handle).await
    }

    /// Applies an event to the sampler. Returns false once the controller should stop.
    pub fn apply(sampler: &mut Sampler, event: Event) -> bool {
        match event {
            Event::Trigger(index) => {
                if !sampler.trigger(index) {
                    info!(index, "Pad not triggered");
                }
            }
            Event::Stop(index) => {
                sampler.stop(index);
            }
            Event::StopAll => {
                sampler.stop_all();
            }
            Event::Select(index) => {
                sampler.select_pad(index);
            }
            Event::Volume(volume) => sampler.set_master_volume(volume),
            Event::Pointer(pointer) => {
                sampler.pointer(pointer);
            }
            Event::Reset => {
                if let Some(region) = sampler.reset_region() {
                    info!(region = %region, "Region reset");
                }
            }
            Event::Status => {
                for pad in sampler.status() {
                    info!("{}", pad);
                }
                info!(
                    bank = sampler.bank().name(),
                    summary = %sampler.bank().summary(),
                    volume = sampler.master_volume(),
                    "Status"
                );
            }
            Event::Quit => return false,
        }
        true
    }

    /// Triggers sampler events by watching the driver and getting events from it.
    async fn trigger_events(sampler: Arc<Mutex<Sampler>>, driver: Arc<dyn Driver>) {
        let (events_tx, mut events_rx) = mpsc::channel(1);
        let join_handle = driver.monitor_events(events_tx);

        info!(bank = sampler.lock().bank().name(), "Controller started.");

        while let Some(event) = events_rx.recv().await {
            info!(event = format!("{:?}", event), "Received event.");
            if !Controller::apply(&mut sampler.lock(), event) {
                break;
            }
        }

        info!("Controller closing.");
        drop(events_rx);
        match join_handle.await {
            Ok(Err(e)) => error!(err = %e, "Event monitor failed"),
            Err(e) => error!("Error waiting for event monitor to stop: {}", e),
            Ok(Ok(())) => {}
        }
    }
}

#[cfg(test)]
mod test {
    use std::{io, sync::Arc};

    use parking_lot::Mutex;
    use tokio::{sync::mpsc::Sender, task::JoinHandle};

    use super::{Controller, Driver, Event};
    use crate::{
        audio::mock,
        region::PointerEvent,
        sample::Bank,
        sampler::Sampler,
        testutil::loaded_sample,
        visualizer::Visualizer,
        waveform::PeakReducer,
    };

    /// Sends a fixed list of events and then returns.
    struct ScriptDriver {
        events: Vec<Event>,
    }

    impl Driver for ScriptDriver {
        fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
            let events = self.events.clone();
            tokio::task::spawn_blocking(move || {
                for event in events {
                    events_tx
                        .blocking_send(event)
                        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
                }
                Ok(())
            })
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_controller() {
        let device = mock::Device::get("mock-device", 1000, 2);
        let mut sampler = Sampler::new(
            Arc::new(device.clone()),
            Visualizer::new(800, 200, 10.0, PeakReducer::new()),
        );
        let mut bank = Bank::new("test");
        bank.insert(loaded_sample(0, 4.0));
        bank.insert(loaded_sample(1, 4.0));
        sampler.install_bank(bank);
        let sampler = Arc::new(Mutex::new(sampler));

        let driver = Arc::new(ScriptDriver {
            events: vec![
                Event::Select(0),
                Event::Pointer(PointerEvent::Move(3.0)),
                Event::Pointer(PointerEvent::Press),
                Event::Pointer(PointerEvent::Move(200.0)),
                Event::Pointer(PointerEvent::Release),
                Event::Trigger(0),
                Event::Trigger(1),
                Event::Stop(1),
                Event::Volume(0.5),
                Event::Status,
                Event::Quit,
                // Never applied.
                Event::StopAll,
            ],
        });
        let mut controller = Controller::new(sampler.clone(), driver);
        assert!(controller.join().await.is_ok(), "Error waiting for controller");

        let sampler = sampler.lock();
        let sample = sampler.bank().get(0).expect("pad 0");
        assert!((sample.start_seconds() - 1.0).abs() < 1e-9);
        assert!(sampler.is_playing(0));
        assert!(!sampler.is_playing(1));
        assert_eq!(sampler.master_volume(), 0.5);
        assert_eq!(device.plays(), 2);
    }
}
