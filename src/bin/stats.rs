use std::collections::VecDeque;
use std::time::Instant;

/// Number of frames averages are taken over.
const WINDOW: usize = 30;

pub struct Stats {
    stamp: Instant,
    last_frametimes: VecDeque<u64>,
    last_draw_calls: VecDeque<usize>,
    frames: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            stamp: Instant::now(),
            last_frametimes: std::iter::repeat(0).take(WINDOW).collect(),
            last_draw_calls: std::iter::repeat(0).take(WINDOW).collect(),
            frames: 0,
        }
    }

    pub fn capture_frame(&mut self, draw_calls: usize) {
        self.last_frametimes.pop_front();
        self.last_frametimes
            .push_back(self.stamp.elapsed().as_micros() as u64);
        self.last_draw_calls.pop_front();
        self.last_draw_calls.push_back(draw_calls);
        self.frames += 1;
        self.stamp = Instant::now();
    }

    /// Average frame time in microseconds.
    pub fn get_average(&self) -> f64 {
        self.last_frametimes.iter().sum::<u64>() as f64 / WINDOW as f64
    }

    pub fn get_average_draw_calls(&self) -> f64 {
        self.last_draw_calls.iter().sum::<usize>() as f64 / WINDOW as f64
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}
