use fps_counter::FPSCounter;
use log::debug;
use std::thread;
use std::time::{Duration, Instant};

/// Paces a loop to a fixed rate by sleeping until the next frame deadline.
///
/// Deadlines advance by exactly one period per frame, so short overruns are
/// absorbed by the following frames. Falling more than a period behind drops
/// the missed frames instead of replaying them in a burst.
#[derive(Debug, Clone)]
pub struct FrameLimiter {
    period: Option<Duration>,
    next: Option<Instant>,
}

impl FrameLimiter {
    /// `rate` is in frames per second. 0 means unlimited.
    pub fn new(rate: u32) -> Self {
        FrameLimiter {
            period: if rate == 0 {
                None
            } else {
                Some(Duration::from_secs(1) / rate)
            },
            next: None,
        }
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// Advances to the next deadline and returns how long to wait from `now`.
    pub fn delay(&mut self, now: Instant) -> Option<Duration> {
        let period = self.period?;
        let deadline = match self.next {
            Some(deadline) => deadline,
            None => {
                self.next = Some(now + period);
                return None;
            }
        };

        if now >= deadline {
            self.next = Some(if now - deadline > period {
                now + period
            } else {
                deadline + period
            });
            None
        } else {
            self.next = Some(deadline + period);
            Some(deadline - now)
        }
    }

    /// Blocks the calling thread until the next frame is due.
    pub fn sync(&mut self) {
        if let Some(delay) = self.delay(Instant::now()) {
            thread::sleep(delay);
        }
    }
}

/// Per-frame bookkeeping run after each frame is submitted.
pub struct FrameStats {
    counter: FPSCounter,
    frames: u64,
    fps: usize,
    last_report: Instant,
}

impl FrameStats {
    pub fn new() -> Self {
        FrameStats {
            counter: FPSCounter::new(),
            frames: 0,
            fps: 0,
            last_report: Instant::now(),
        }
    }

    pub fn update(&mut self) {
        self.frames += 1;
        self.fps = self.counter.tick();
        if self.last_report.elapsed() >= Duration::from_secs(1) {
            self.last_report = Instant::now();
            debug!("frame {}: {} fps", self.frames, self.fps);
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn fps(&self) -> usize {
        self.fps
    }
}
