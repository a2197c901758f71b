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

//! Offline rendering of an event schedule.
//!
//! Delays become frame counts instead of sleeps. Event times are tracked in
//! absolute terms so rounding never accumulates.

use std::path::Path;
use std::time::Duration;

use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::{info, warn};

use super::AudioError;
use crate::engine::{Dispatcher, Renderer};
use crate::events::TimedEvent;
use crate::util::duration_frames;

const BLOCK_FRAMES: usize = 512;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub frames: u64,
    pub events: usize,
    pub dropped: usize,
}

/// Renders a schedule block by block, handing each interleaved block to `sink`.
/// `tail` extra time is rendered after the last event so releases can finish.
pub fn render_schedule<F>(
    renderer: &mut Renderer,
    dispatcher: &mut Dispatcher,
    schedule: &[TimedEvent],
    sample_rate: u32,
    channels: u16,
    tail: Duration,
    mut sink: F,
) -> Result<RenderStats, AudioError>
where
    F: FnMut(&[f32]) -> Result<(), AudioError>,
{
    let channels = usize::from(channels.max(1));
    let mut block = vec![0.0f32; BLOCK_FRAMES * channels];
    let mut stats = RenderStats::default();
    let mut elapsed = Duration::ZERO;

    let mut render_until = |target: u64, stats: &mut RenderStats, renderer: &mut Renderer| {
        while stats.frames < target {
            let frames = usize::try_from(target - stats.frames)
                .unwrap_or(usize::MAX)
                .min(BLOCK_FRAMES);
            let out = &mut block[..frames * channels];
            renderer.render(out, channels);
            sink(out)?;
            stats.frames += frames as u64;
        }
        Ok::<(), AudioError>(())
    };

    for timed in schedule {
        elapsed += timed.delay;
        render_until(duration_frames(elapsed, sample_rate), &mut stats, renderer)?;
        match dispatcher.dispatch(timed.event) {
            Ok(()) => stats.events += 1,
            Err(e) => {
                warn!(err = %e, event = ?timed.event, "Dropping event");
                stats.dropped += 1;
            }
        }
        // Apply now so a burst of simultaneous events never fills the queue.
        renderer.apply_pending();
        dispatcher.housekeeping();
    }
    render_until(duration_frames(elapsed + tail, sample_rate), &mut stats, renderer)?;

    Ok(stats)
}

/// Renders a schedule to a 32-bit float WAV file.
pub fn render_to_wav(
    path: &Path,
    renderer: &mut Renderer,
    dispatcher: &mut Dispatcher,
    schedule: &[TimedEvent],
    sample_rate: u32,
    channels: u16,
    tail: Duration,
) -> Result<RenderStats, AudioError> {
    let mut writer = WavWriter::create(
        path,
        WavSpec {
            channels: channels.max(1),
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        },
    )?;

    let stats = render_schedule(
        renderer,
        dispatcher,
        schedule,
        sample_rate,
        channels,
        tail,
        |block| {
            for sample in block {
                writer.write_sample(*sample)?;
            }
            Ok(())
        },
    )?;
    writer.finalize()?;

    info!(
        path = ?path,
        frames = stats.frames,
        events = stats.events,
        dropped = stats.dropped,
        "Rendered"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::engine::{command_queue, Envelope, VelocityCurve};
    use crate::events::{Event, Strike};
    use crate::samples::SampleStore;

    const RATE: u32 = 1000;

    fn engine() -> (Renderer, Dispatcher) {
        let mut store = SampleStore::new(2000, 3);
        store.load_samples(0, &[16384; 1000]).unwrap();
        let (tx, rx) = command_queue(4);
        let renderer = Renderer::new(Arc::new(store), 1, Envelope::new(0, 4), 1, rx);
        let dispatcher = Dispatcher::new(tx, VelocityCurve::default(), 80, 1);
        (renderer, dispatcher)
    }

    fn schedule() -> Vec<TimedEvent> {
        vec![
            TimedEvent::new(
                Duration::ZERO,
                Event::KeyDown {
                    key: 0,
                    strike: Strike::AttackTime(10_000),
                },
            ),
            TimedEvent::new(Duration::from_millis(100), Event::KeyUp { key: 0 }),
        ]
    }

    #[test]
    fn test_render_schedule() {
        let (mut renderer, mut dispatcher) = engine();
        let mut out = Vec::new();
        let stats = render_schedule(
            &mut renderer,
            &mut dispatcher,
            &schedule(),
            RATE,
            1,
            Duration::from_millis(50),
            |block| {
                out.extend_from_slice(block);
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(
            stats,
            RenderStats {
                frames: 150,
                events: 2,
                dropped: 0
            }
        );
        assert_eq!(out.len(), 150);
        assert!(out[..100].iter().all(|s| *s == 0.5));
        assert!(out[110..].iter().all(|s| *s == 0.0));
        assert!(!renderer.is_active());
    }

    #[test]
    fn test_key_down_sustain_then_linear_release() {
        let mut store = SampleStore::new(2000, 6);
        store.load_samples(3, &[16384; 1000]).unwrap();
        let (tx, rx) = command_queue(4);
        let mut renderer = Renderer::new(Arc::new(store), 4, Envelope::new(0, 8), 1, rx);
        let mut dispatcher = Dispatcher::new(tx, VelocityCurve::default(), 80, 4);
        let schedule = vec![
            TimedEvent::new(
                Duration::ZERO,
                Event::KeyDown {
                    key: 3,
                    strike: Strike::AttackTime(300),
                },
            ),
            TimedEvent::new(Duration::from_millis(100), Event::KeyUp { key: 3 }),
        ];

        let mut out = Vec::new();
        render_schedule(
            &mut renderer,
            &mut dispatcher,
            &schedule,
            RATE,
            1,
            Duration::from_millis(50),
            |block| {
                out.extend_from_slice(block);
                Ok(())
            },
        )
        .unwrap();

        // A strike faster than the curve's range plays at max gain.
        assert!(out[..100].iter().all(|s| *s == 0.5));
        for i in 0..8 {
            assert_eq!(out[100 + i], 0.5 * (8 - i) as f32 / 8.0, "frame {}", 100 + i);
        }
        assert!(out[108..].iter().all(|s| *s == 0.0));
        assert!(!renderer.table().voice(3).unwrap().is_playing());
    }

    #[test]
    fn test_bursts_do_not_overflow_queue() {
        let (mut renderer, mut dispatcher) = engine();
        let burst: Vec<TimedEvent> = (0..20)
            .map(|_| TimedEvent::new(Duration::ZERO, Event::PedalDown))
            .collect();
        let stats = render_schedule(
            &mut renderer,
            &mut dispatcher,
            &burst,
            RATE,
            2,
            Duration::from_millis(10),
            |_| Ok(()),
        )
        .unwrap();
        assert_eq!(stats.events, 20);
        assert_eq!(stats.dropped, 0);
        assert_eq!(stats.frames, 10);
    }

    #[test]
    fn test_unknown_key_is_counted() {
        let (mut renderer, mut dispatcher) = engine();
        let schedule = vec![TimedEvent::new(Duration::ZERO, Event::KeyUp { key: 9 })];
        let stats = render_schedule(
            &mut renderer,
            &mut dispatcher,
            &schedule,
            RATE,
            1,
            Duration::ZERO,
            |_| Ok(()),
        )
        .unwrap();
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.frames, 0);
    }

    #[test]
    fn test_render_to_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let (mut renderer, mut dispatcher) = engine();

        render_to_wav(
            &path,
            &mut renderer,
            &mut dispatcher,
            &schedule(),
            RATE,
            2,
            Duration::from_millis(50),
        )
        .unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, RATE);
        assert_eq!(spec.sample_format, SampleFormat::Float);
        let samples: Vec<f32> = reader.into_samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 300);
        assert_eq!(samples[0], 0.5);
        assert_eq!(samples[1], 0.5);
    }
}
