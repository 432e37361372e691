//! fieldjudge core: officiating engine for track-and-field field events.
//!
//! This crate holds everything that decides what happens on the runway:
//! - Domain types (athletes, heights, attempt outcomes, per-height records)
//! - The height ladder and its cursor
//! - Elimination rules, including failures carried through passes
//! - The command-driven competition state and the progression scheduler
//! - Standings with the failures-at-best and total-failures tie-breaks
//! - Round-robin scheduling for horizontal events
//! - Persistence and roster contracts for the application shell
//!
//! No I/O happens here apart from reading a roster file.

pub mod domain;
pub mod engine;
pub mod horizontal;
pub mod ladder;
pub mod persistence;
pub mod roster;
pub mod simulate;
pub mod standings;
