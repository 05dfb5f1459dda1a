//! Shared fixtures for unit tests: tiny GIFs, solid images, recording sinks.
use std::borrow::Cow;
use std::time::Duration;

use glam::Vec2;
use rgb::RGBA8;

use crate::assets::{AssetRequest, MemoryStore};
use crate::clock::FrameSink;
use crate::mascot::Host;
use crate::motion::Bounds;
use crate::sequence::{Frame, FrameSequence, Image};
use crate::worker::{DecodeJob, DecodeOutcome};

/// 1x1 image whose red channel tags it.
pub fn solid(tag: u8) -> Image {
    Image::new(vec![RGBA8::new(tag, 0, 0, 255)], 1, 1)
}

/// `n` tagged frames, 100ms each.
pub fn sequence(n: u8) -> FrameSequence {
    sequence_with(&vec![Duration::from_millis(100); usize::from(n)])
}

pub fn sequence_with(durations: &[Duration]) -> FrameSequence {
    let frames = durations
        .iter()
        .enumerate()
        .map(|(i, &duration)| Frame {
            pixels: solid(i as u8),
            duration,
        })
        .collect();
    FrameSequence::new(frames).unwrap()
}

/// 2x2 GIF with one frame per delay (centiseconds). Frames alternate black/white.
pub fn gif_bytes(delays: &[u16]) -> Vec<u8> {
    let palette = [0, 0, 0, 255, 255, 255];
    let mut out = Vec::new();
    {
        let mut encoder = gif::Encoder::new(&mut out, 2, 2, &palette).unwrap();
        for (i, &delay) in delays.iter().enumerate() {
            let frame = gif::Frame {
                width: 2,
                height: 2,
                delay,
                buffer: Cow::Owned(vec![(i % 2) as u8; 4]),
                ..Default::default()
            };
            encoder.write_frame(&frame).unwrap();
        }
    }
    out
}

const TINY_HEADER: [u8; 19] = [
    b'G', b'I', b'F', b'8', b'9', b'a', // signature
    1, 0, 1, 0, 0x80, 0, 0, // 1x1, 2-colour global table
    0, 0, 0, 255, 255, 255, // palette
];
const TINY_IMAGE: [u8; 15] = [
    0x2C, 0, 0, 0, 0, 1, 0, 1, 0, 0, // descriptor
    2, 2, 0x44, 0x01, 0, // LZW: clear, 0, end
];

/// 1x1 GIF; `None` entries get no Graphic Control Extension at all.
pub fn tiny_gif_with_delays(delays: &[Option<u16>]) -> Vec<u8> {
    let mut out = TINY_HEADER.to_vec();
    for delay in delays {
        if let Some(cs) = delay {
            let [lo, hi] = cs.to_le_bytes();
            out.extend_from_slice(&[0x21, 0xF9, 4, 0, lo, hi, 0, 0]);
        }
        out.extend_from_slice(&TINY_IMAGE);
    }
    out.push(0x3B);
    out
}

pub fn gif_without_timing() -> Vec<u8> {
    tiny_gif_with_delays(&[None])
}

/// Store with `main` still, `patoka_r`/`patoka_l` animations and a few extras.
pub fn demo_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    store.insert_still("main", solid(200));
    store.insert_container("patoka_r", gif_bytes(&[10, 10, 10]));
    store.insert_container("patoka_l", gif_bytes(&[10, 10]));
    store
}

/// Records everything the mascot asks of the windowing layer.
#[derive(Default)]
pub struct RecordingHost {
    pub shown: Vec<RGBA8>,
    pub placed: Vec<Vec2>,
    pub jobs: Vec<DecodeJob>,
    pub bounds: Option<Bounds>,
    pub bounds_queries: usize,
}

impl RecordingHost {
    pub fn with_bounds(bounds: Bounds) -> Self {
        Self {
            bounds: Some(bounds),
            ..Default::default()
        }
    }

    /// Red channel of the last image shown.
    pub fn last_tag(&self) -> Option<u8> {
        self.shown.last().map(|px| px.r)
    }

    /// Run every queued decode inline, oldest first.
    pub fn run_jobs(&mut self) -> Vec<DecodeOutcome> {
        self.jobs.drain(..).map(DecodeJob::run).collect()
    }

    pub fn last_job_name(&self) -> Option<&str> {
        self.jobs.last().map(|j| j.name.as_str())
    }
}

impl FrameSink for RecordingHost {
    fn show(&mut self, image: &Image) {
        self.shown.push(image.buf()[0]);
    }
}

impl Host for RecordingHost {
    fn place(&mut self, center: Vec2) {
        self.placed.push(center);
    }

    fn visible_bounds(&mut self) -> Option<Bounds> {
        self.bounds_queries += 1;
        self.bounds
    }

    fn submit(&mut self, job: DecodeJob) {
        self.jobs.push(job);
    }
}

pub fn animated(name: &str) -> AssetRequest {
    AssetRequest::animated(name)
}

pub fn still(name: &str) -> AssetRequest {
    AssetRequest::still(name)
}
