//! Reconciliation pass state machine.
//!
//! One pass lists the modem, classifies every listed message against the
//! processed ledger, optionally deletes the new ones, then publishes. The
//! machine only orders these phases; the engine in `sms-gateway` performs
//! the I/O and feeds the outcome back as the next event.
//!
//! Cleaning is skipped when auto-delete is off or nothing new was recorded.
//!
//! A tick that arrives while a pass is running produces [`PassAction::SkipTick`]
//! and leaves the state untouched. Ticks are never queued.

/// Pass state machine - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PassState {
    /// No pass running.
    #[default]
    Idle,
    /// Fetching the message list and status from the modem.
    Listing {
        /// Whether new messages are deleted after being recorded.
        auto_delete: bool,
    },
    /// Recording fingerprints of listed messages.
    Classifying {
        /// Whether new messages are deleted after being recorded.
        auto_delete: bool,
        /// Messages returned by the listing.
        listed: usize,
    },
    /// Deleting newly recorded messages from the modem.
    Cleaning {
        /// Messages classified as new.
        new: usize,
    },
    /// Handing the batch to the publisher.
    Publishing {
        /// Messages classified as new.
        new: usize,
    },
}

impl PassState {
    /// Create a new state machine in the Idle state.
    pub fn new() -> Self {
        Self::Idle
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects.
    pub fn on_event(self, event: PassEvent) -> (Self, Vec<PassAction>) {
        match (self, event) {
            (Self::Idle, PassEvent::Tick { auto_delete }) => {
                (Self::Listing { auto_delete }, vec![PassAction::FetchRemote])
            }
            (state, PassEvent::Tick { .. }) => (state, vec![PassAction::SkipTick]),

            (Self::Listing { auto_delete }, PassEvent::Listed { count }) => (
                Self::Classifying {
                    auto_delete,
                    listed: count,
                },
                vec![PassAction::Classify],
            ),
            (Self::Listing { .. }, PassEvent::ListingFailed { error }) => {
                (Self::Idle, vec![PassAction::Abort { error }])
            }

            // Cleaning is only entered when there is something to delete
            (Self::Classifying { auto_delete, .. }, PassEvent::Classified { new }) => {
                if auto_delete && new > 0 {
                    (Self::Cleaning { new }, vec![PassAction::DeleteNew])
                } else {
                    (Self::Publishing { new }, vec![PassAction::Publish])
                }
            }

            (Self::Cleaning { new }, PassEvent::Cleaned { .. }) => {
                (Self::Publishing { new }, vec![PassAction::Publish])
            }

            (Self::Publishing { new }, PassEvent::Published) => {
                (Self::Idle, vec![PassAction::Complete { new }])
            }

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// Check if a pass is running.
    pub fn is_busy(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    /// Short phase name for logs and status output.
    pub fn phase(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listing { .. } => "listing",
            Self::Classifying { .. } => "classifying",
            Self::Cleaning { .. } => "cleaning",
            Self::Publishing { .. } => "publishing",
        }
    }
}

/// Events that drive a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassEvent {
    /// Interval timer fired.
    Tick {
        /// Whether new messages are deleted after being recorded.
        auto_delete: bool,
    },
    /// Listing returned.
    Listed {
        /// Number of messages listed.
        count: usize,
    },
    /// Listing failed at the transport layer.
    ListingFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// Every listed message was classified.
    Classified {
        /// Number of newly recorded messages.
        new: usize,
    },
    /// Cleaning finished (possibly with nothing to do).
    Cleaned {
        /// Number of messages deleted from the modem.
        deleted: usize,
    },
    /// Publish batch handed off (success or logged failure).
    Published,
}

/// Actions the engine executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassAction {
    /// List messages and refresh status.
    FetchRemote,
    /// Record fingerprints of the listed messages.
    Classify,
    /// Delete the newly recorded messages from the modem.
    DeleteNew,
    /// Publish new messages, status and counters.
    Publish,
    /// Pass finished.
    Complete {
        /// Number of new messages in this pass.
        new: usize,
    },
    /// Pass aborted; durable state untouched.
    Abort {
        /// Error message describing the failure.
        error: String,
    },
    /// A pass is already running; this tick is dropped.
    SkipTick,
}
