//! Signing and verifying many records at once.
//!
//! Work fans out over scoped threads that borrow the key; there is no shared
//! mutable state. Results come back in input order regardless of which
//! thread finishes first.

use std::{num::NonZeroUsize, thread};

use serde_json::Value;
use tracing::debug;
use vac_crypto::{PublicKey, SigningKeyPair};

use crate::{
    clock::Clock,
    error::{Result, VacError},
    signer::{SignedRecord, Signer},
    verifier::{Verification, verify_record},
};

/// One record to verify: envelope bytes and the record tree they should
/// cover.
#[derive(Debug, Clone, Copy)]
pub struct VerifyJob<'a> {
    /// Encoded envelope
    pub envelope: &'a [u8],
    /// Independently sourced record
    pub record: &'a Value,
}

/// Sign every record with `signer`.
pub fn sign_batch<C: Clock>(signer: &Signer<'_, C>, records: &[Value]) -> Vec<Result<SignedRecord>> {
    fan_out(records, |record| signer.sign(record))
}

/// Sign every record with `key` using the system clock.
pub fn sign_batch_with_key(key: &SigningKeyPair, records: &[Value]) -> Vec<Result<SignedRecord>> {
    sign_batch(&Signer::new(key), records)
}

/// Verify every job against `key`.
pub fn verify_batch(jobs: &[VerifyJob<'_>], key: &PublicKey) -> Vec<Result<Verification>> {
    fan_out(jobs, |job| verify_record(job.envelope, job.record, key))
}

fn fan_out<T, R, F>(items: &[T], work: F) -> Vec<Result<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> Result<R> + Sync,
{
    if items.is_empty() {
        return Vec::new();
    }

    let workers = thread::available_parallelism().map_or(1, NonZeroUsize::get).min(items.len());
    let chunk_size = items.len().div_ceil(workers);
    debug!(items = items.len(), workers, "fanning out batch");

    let work = &work;
    thread::scope(|scope| {
        let handles: Vec<_> = items
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move || chunk.iter().map(work).collect::<Vec<_>>()))
            .collect();

        let mut results = Vec::with_capacity(items.len());
        for (handle, chunk) in handles.into_iter().zip(items.chunks(chunk_size)) {
            match handle.join() {
                Ok(chunk_results) => results.extend(chunk_results),
                Err(_) => results.extend(chunk.iter().map(|_| {
                    Err(VacError::EnvelopeEncode("batch worker panicked".to_string()))
                })),
            }
        }
        results
    })
}
