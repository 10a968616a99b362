//! Parameter automation in the style of a Web Audio `AudioParam`.
//!
//! A timeline of events, each either an instant jump (`set_value_at_time`)
//! or a linear ramp that ends at its time (`linear_ramp_to_value_at_time`).
//! A ramp starts from the value and time of the event before it.

#[derive(Debug, Clone, Copy, PartialEq)]
enum EventKind {
    Set,
    LinearRamp,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct AutomationEvent {
    kind: EventKind,
    value: f64,
    time: f64,
}

#[derive(Debug, Clone)]
pub struct Automation {
    default_value: f64,
    /// Sorted by time; events at equal times keep insertion order.
    events: Vec<AutomationEvent>,
}

impl Automation {
    pub fn new(default_value: f64) -> Self {
        Automation {
            default_value,
            events: Vec::new(),
        }
    }

    pub fn set_value_at_time(&mut self, value: f64, time: f64) -> &mut Self {
        self.insert(AutomationEvent {
            kind: EventKind::Set,
            value,
            time,
        })
    }

    pub fn linear_ramp_to_value_at_time(&mut self, value: f64, time: f64) -> &mut Self {
        self.insert(AutomationEvent {
            kind: EventKind::LinearRamp,
            value,
            time,
        })
    }

    fn insert(&mut self, event: AutomationEvent) -> &mut Self {
        let idx = self.events.partition_point(|e| e.time <= event.time);
        self.events.insert(idx, event);
        self
    }

    /// Parameter value at `time` (seconds on the audio clock).
    pub fn value_at(&self, time: f64) -> f64 {
        // Index of the first event strictly after `time`.
        let next = self.events.partition_point(|e| e.time <= time);

        let (prev_value, prev_time) = match next.checked_sub(1) {
            Some(i) => (self.events[i].value, self.events[i].time),
            None => (self.default_value, 0.0),
        };

        match self.events.get(next) {
            Some(e) if e.kind == EventKind::LinearRamp => {
                let span = e.time - prev_time;
                if span <= 0.0 {
                    return e.value;
                }
                let t = ((time - prev_time) / span).clamp(0.0, 1.0);
                prev_value + (e.value - prev_value) * t
            }
            _ => prev_value,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_value_without_events() {
        let a = Automation::new(1.0);
        assert_eq!(a.value_at(0.0), 1.0);
        assert_eq!(a.value_at(10.0), 1.0);
        assert!(a.is_empty());
    }

    #[test]
    fn set_value_holds_until_next_event() {
        let mut a = Automation::new(1.0);
        a.set_value_at_time(0.25, 1.0);
        assert_eq!(a.value_at(0.5), 1.0);
        assert_eq!(a.value_at(1.0), 0.25);
        assert_eq!(a.value_at(5.0), 0.25);
    }

    #[test]
    fn ramp_interpolates_from_previous_event() {
        let mut a = Automation::new(1.0);
        a.set_value_at_time(0.0, 2.0)
            .linear_ramp_to_value_at_time(1.0, 3.0)
            .linear_ramp_to_value_at_time(0.0, 5.0);
        assert_eq!(a.value_at(2.0), 0.0);
        assert!((a.value_at(2.5) - 0.5).abs() < 1e-12);
        assert_eq!(a.value_at(3.0), 1.0);
        assert!((a.value_at(4.0) - 0.5).abs() < 1e-12);
        assert_eq!(a.value_at(5.0), 0.0);
        assert_eq!(a.value_at(6.0), 0.0);
    }

    #[test]
    fn ramp_before_any_event_starts_from_default() {
        let mut a = Automation::new(0.0);
        a.linear_ramp_to_value_at_time(1.0, 2.0);
        assert!((a.value_at(1.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn events_sorted_regardless_of_insert_order() {
        let mut a = Automation::new(0.0);
        a.linear_ramp_to_value_at_time(1.0, 1.0);
        a.set_value_at_time(0.0, 0.0);
        assert!((a.value_at(0.5) - 0.5).abs() < 1e-12);
    }
}
