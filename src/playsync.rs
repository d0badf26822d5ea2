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
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// A cancel handle is handed to the output device along with every voice. The device
/// drops the voice the next time it mixes and sees the handle cancelled.
#[derive(Clone, Default, Debug)]
pub struct CancelHandle {
    /// Set to true once the voice should stop producing audio.
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Creates a new cancel handle.
    pub fn new() -> CancelHandle {
        CancelHandle {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns true if the voice has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Cancels the voice. Returns true if this call performed the cancellation, false if
    /// the handle was already cancelled.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod test {
    use std::thread;

    use super::*;

    #[test]
    fn test_cancel_handle_cancelled() {
        let cancel_handle = CancelHandle::new();
        assert!(!cancel_handle.is_cancelled());

        let join = {
            let cancel_handle = cancel_handle.clone();
            thread::spawn(move || cancel_handle.cancel())
        };

        assert!(join.join().expect("thread panicked"));
        assert!(cancel_handle.is_cancelled());
    }

    #[test]
    fn test_cancel_handle_cancel_twice() {
        let cancel_handle = CancelHandle::new();
        assert!(cancel_handle.cancel());
        assert!(!cancel_handle.cancel());
        assert!(cancel_handle.is_cancelled());
    }
}
