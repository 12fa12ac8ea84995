//! Backpressure controller
//!
//! Counts messages in transit (claimed deliveries and sends in progress)
//! against `maxProcessingMessages`. Reaching the limit raises the
//! limits-pause; dropping back under it clears the flag again.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backpressure {
    max_processing_messages: usize,
    messages_in_transit: usize,
    paused_by_limits: bool,
}

impl Backpressure {
    pub fn new(max_processing_messages: usize) -> Self {
        Self {
            max_processing_messages,
            messages_in_transit: 0,
            paused_by_limits: false,
        }
    }

    /// Count one more message in transit. Returns true if this claim raised
    /// the limits-pause.
    pub fn claim(&mut self) -> bool {
        self.messages_in_transit += 1;
        if !self.paused_by_limits && self.messages_in_transit >= self.max_processing_messages {
            self.paused_by_limits = true;
            return true;
        }
        false
    }

    /// Count one message as done. Returns true if this release cleared the
    /// limits-pause.
    pub fn release(&mut self) -> bool {
        self.messages_in_transit = self.messages_in_transit.saturating_sub(1);
        if self.paused_by_limits && self.messages_in_transit < self.max_processing_messages {
            self.paused_by_limits = false;
            return true;
        }
        false
    }

    pub fn in_transit(&self) -> usize {
        self.messages_in_transit
    }

    pub fn is_paused(&self) -> bool {
        self.paused_by_limits
    }

    pub fn max_processing_messages(&self) -> usize {
        self.max_processing_messages
    }
}
