// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
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

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, span, warn, Level};

use super::Event;
use crate::region::PointerEvent;

/// Pad keys, laid out as a 4x4 grid on the left of the keyboard.
const PAD_KEYS: [char; 16] = [
    '1', '2', '3', '4', 'q', 'w', 'e', 'r', 'a', 's', 'd', 'f', 'z', 'x', 'c', 'v',
];

const TRIGGER: &str = "trigger";
const STOP: &str = "stop";
const STOP_ALL: &str = "stopall";
const SELECT: &str = "select";
const VOLUME: &str = "volume";
const MOVE: &str = "move";
const PRESS: &str = "press";
const RELEASE: &str = "release";
const LEAVE: &str = "leave";
const RESET: &str = "reset";
const STATUS: &str = "status";
const QUIT: &str = "quit";

/// Parses a line of input into an event.
pub fn parse(input: &str) -> Option<Event> {
    let input = input.trim().to_lowercase();
    let mut chars = input.chars();
    if let (Some(key), None) = (chars.next(), chars.next()) {
        return PAD_KEYS
            .iter()
            .position(|pad_key| *pad_key == key)
            .map(Event::Trigger);
    }

    let mut words = input.split_whitespace();
    let command = words.next()?;
    let argument = words.next();
    if words.next().is_some() {
        return None;
    }

    match (command, argument) {
        (TRIGGER, Some(index)) => index.parse().ok().map(Event::Trigger),
        (STOP, Some(index)) => index.parse().ok().map(Event::Stop),
        (STOP_ALL, None) => Some(Event::StopAll),
        (SELECT, Some(index)) => index.parse().ok().map(Event::Select),
        (VOLUME, Some(volume)) => volume.parse().ok().map(Event::Volume),
        (MOVE, Some(x)) => x
            .parse()
            .ok()
            .map(|x| Event::Pointer(PointerEvent::Move(x))),
        (PRESS, None) => Some(Event::Pointer(PointerEvent::Press)),
        (RELEASE, None) => Some(Event::Pointer(PointerEvent::Release)),
        (LEAVE, None) => Some(Event::Pointer(PointerEvent::Leave)),
        (RESET, None) => Some(Event::Reset),
        (STATUS, None) => Some(Event::Status),
        (QUIT, None) => Some(Event::Quit),
        _ => None,
    }
}

/// A controller that controls a sampler using the keyboard.
pub struct Driver {}

impl Driver {
    pub fn new() -> Driver {
        Driver {}
    }

    /// Reads and forwards one command. Returns false once input is exhausted or the
    /// user quit.
    fn monitor_io<R, W>(
        events_tx: &Sender<Event>,
        mut reader: R,
        mut writer: W,
    ) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(
            writer,
            "Command (pad keys 1234/qwer/asdf/zxcv, {TRIGGER} N, {STOP} N, {STOP_ALL}, \
             {SELECT} N, {VOLUME} V, {MOVE} X, {PRESS}, {RELEASE}, {LEAVE}, {RESET}, \
             {STATUS}, {QUIT}): ",
        )?;
        writer.flush()?;
        let mut input: String = String::default();
        let event = if reader.read_line(&mut input)? == 0 {
            Event::Quit
        } else {
            match parse(&input) {
                Some(event) => event,
                None => {
                    if !input.trim().is_empty() {
                        warn!(input = input.trim(), "Unrecognized input");
                    }
                    return Ok(true);
                }
            }
        };

        let keep_going = event != Event::Quit;
        events_tx
            .blocking_send(event)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(keep_going)
    }
}

impl Default for Driver {
    fn default() -> Self {
        Driver::new()
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            while Self::monitor_io(&events_tx, io::stdin().lock(), io::stdout())? {}
            info!("Keyboard driver stopped.");
            Ok(())
        })
    }
}

#[cfg(test)]
mod test {
    use std::io::{self, BufReader, BufWriter};

    use tokio::sync::mpsc;

    use crate::controller::{keyboard::*, Event};
    use crate::region::PointerEvent;

    use super::Driver;

    fn get_event(event: &str) -> Result<(bool, Option<Event>), io::Error> {
        let (sender, mut receiver) = mpsc::channel::<Event>(1);

        let reader = BufReader::new(event.as_bytes());

        let writer_bytes: Vec<u8> = vec![0; 255];
        let writer = BufWriter::new(writer_bytes);
        let keep_going = Driver::monitor_io(&sender, reader, writer)?;

        // Force the sender to close.
        drop(sender);
        Ok((keep_going, receiver.blocking_recv()))
    }

    #[test]
    fn test_pad_keys() {
        assert_eq!(parse("1"), Some(Event::Trigger(0)));
        assert_eq!(parse("r"), Some(Event::Trigger(7)));
        assert_eq!(parse("A\n"), Some(Event::Trigger(8)));
        assert_eq!(parse("v"), Some(Event::Trigger(15)));
        assert_eq!(parse("p"), None);
    }

    #[test]
    fn test_commands() {
        assert_eq!(parse("trigger 12"), Some(Event::Trigger(12)));
        assert_eq!(parse("stop 3"), Some(Event::Stop(3)));
        assert_eq!(parse("stopall"), Some(Event::StopAll));
        assert_eq!(parse("select 2"), Some(Event::Select(2)));
        assert_eq!(parse("volume 0.25"), Some(Event::Volume(0.25)));
        assert_eq!(
            parse("move 120.5"),
            Some(Event::Pointer(PointerEvent::Move(120.5)))
        );
        assert_eq!(parse("press"), Some(Event::Pointer(PointerEvent::Press)));
        assert_eq!(
            parse("release"),
            Some(Event::Pointer(PointerEvent::Release))
        );
        assert_eq!(parse("leave"), Some(Event::Pointer(PointerEvent::Leave)));
        assert_eq!(parse("RESET"), Some(Event::Reset));
        assert_eq!(parse("status"), Some(Event::Status));
        assert_eq!(parse("quit"), Some(Event::Quit));

        assert_eq!(parse("stop"), None);
        assert_eq!(parse("trigger x"), None);
        assert_eq!(parse("select 1 2"), None);
        assert_eq!(parse(""), None);
    }

    #[test]
    fn test_keyboard_events() -> Result<(), io::Error> {
        assert_eq!((true, Some(Event::Trigger(1))), get_event("2\n")?);
        assert_eq!((true, Some(Event::StopAll)), get_event("stopall\n")?);
        assert_eq!((false, Some(Event::Quit)), get_event("quit\n")?);
        assert_eq!((true, None), get_event("unrecognized\n")?);
        // End of input quits.
        assert_eq!((false, Some(Event::Quit)), get_event("")?);
        Ok(())
    }
}
