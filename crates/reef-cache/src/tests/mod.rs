//! Group-level tests wiring tiers, peers, and the fill path together.

mod helpers;
