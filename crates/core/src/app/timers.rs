use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

pub const PRICE_REFRESH: Duration = Duration::from_secs(20);
pub const MACRO_REFRESH: Duration = Duration::from_secs(600);
pub const CLOCK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Prices,
    Macro,
    Clock,
}

/// The three periodic jobs. Each first fires one full period after arming; ticks missed while
/// a handler runs are skipped rather than replayed. Dropping the value cancels all of them.
#[derive(Debug)]
pub struct Timers {
    prices: Interval,
    macro_refresh: Interval,
    clock: Interval,
}

impl Timers {
    pub fn arm() -> Self {
        Self {
            prices: periodic(PRICE_REFRESH),
            macro_refresh: periodic(MACRO_REFRESH),
            clock: periodic(CLOCK),
        }
    }

    pub async fn next(&mut self) -> Tick {
        tokio::select! {
            _ = self.clock.tick() => Tick::Clock,
            _ = self.prices.tick() => Tick::Prices,
            _ = self.macro_refresh.tick() => Tick::Macro,
        }
    }
}

fn periodic(period: Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_ticks_follow_their_periods() {
        let start = Instant::now();
        let mut timers = Timers::arm();
        let mut seen = Vec::new();
        while seen.len() < 25 {
            let tick = timers.next().await;
            seen.push((tick, Instant::now() - start));
        }

        let first_price = seen.iter().find(|(t, _)| *t == Tick::Prices).unwrap();
        assert_eq!(first_price.1, PRICE_REFRESH);
        assert_eq!(seen[0], (Tick::Clock, CLOCK));
        assert!(!seen.iter().any(|(t, _)| *t == Tick::Macro));
    }

    #[tokio::test(start_paused = true)]
    async fn macro_refresh_fires_every_ten_minutes() {
        let start = Instant::now();
        let mut timers = Timers::arm();
        let at = loop {
            if timers.next().await == Tick::Macro {
                break Instant::now() - start;
            }
        };
        assert_eq!(at, MACRO_REFRESH);
    }
}
