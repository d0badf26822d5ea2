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

use thread_priority::{set_current_thread_priority, ThreadPriority, ThreadPriorityValue};
use tracing::{info, warn};

/// Default priority for the mixing thread when PADTRIM_THREAD_PRIORITY is unset.
const DEFAULT_CALLBACK_THREAD_PRIORITY: u8 = 70;

fn parse_priority(value: Option<&str>) -> Option<ThreadPriorityValue> {
    let n = value?.trim().parse::<u8>().ok()?;
    ThreadPriorityValue::try_from(n).ok()
}

/// Reads PADTRIM_THREAD_PRIORITY (0-99), falling back to the default.
pub fn callback_thread_priority() -> Option<ThreadPriorityValue> {
    parse_priority(std::env::var("PADTRIM_THREAD_PRIORITY").ok().as_deref())
        .or_else(|| ThreadPriorityValue::try_from(DEFAULT_CALLBACK_THREAD_PRIORITY).ok())
}

fn is_truthy(value: &str) -> bool {
    value == "1"
        || value.eq_ignore_ascii_case("true")
        || value.eq_ignore_ascii_case("yes")
        || value.eq_ignore_ascii_case("on")
}

/// Returns whether we should attempt RT (SCHED_FIFO) scheduling for the mixing thread.
/// Opt out with PADTRIM_DISABLE_RT_AUDIO=1.
pub fn rt_audio_enabled() -> bool {
    !std::env::var("PADTRIM_DISABLE_RT_AUDIO")
        .map(|v| is_truthy(&v))
        .unwrap_or(false)
}

pub fn configure_audio_thread_priority(
    priority: ThreadPriorityValue,
    rt_audio: bool,
    priority_set: &mut bool,
) {
    if *priority_set {
        return;
    }
    let tp = ThreadPriority::Crossplatform(priority);
    if let Err(e) = set_current_thread_priority(tp) {
        warn!(error = ?e, "Unable to raise mixing thread priority");
    }

    #[cfg(unix)]
    if rt_audio {
        use thread_priority::unix::{
            set_thread_priority_and_policy, thread_native_id, RealtimeThreadSchedulePolicy,
            ThreadSchedulePolicy,
        };
        let tid = thread_native_id();
        match set_thread_priority_and_policy(
            tid,
            tp,
            ThreadSchedulePolicy::Realtime(RealtimeThreadSchedulePolicy::Fifo),
        ) {
            Ok(()) => {
                info!("Enabled RT SCHED_FIFO for mixing thread");
            }
            Err(e) => {
                warn!(error = ?e, "Failed to set RT SCHED_FIFO for mixing thread");
            }
        }
    }
    #[cfg(not(unix))]
    let _ = rt_audio;

    *priority_set = true;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_priority() {
        assert!(parse_priority(Some(" 42 ")).is_some());
        assert!(parse_priority(Some("100")).is_none());
        assert!(parse_priority(Some("high")).is_none());
        assert!(parse_priority(None).is_none());
    }

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy("1"));
        assert!(is_truthy("YES"));
        assert!(is_truthy("on"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy(""));
    }
}
