// Copyright (C) 2024, 2025 Firopool Developers (see AUTHORS)
//
// This file is part of Firopool
//
// Firopool is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Firopool is distributed in the hope that it will be useful, but WITHOUT ANY
// WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// Firopool. If not, see <https://www.gnu.org/licenses/>.

use crate::config::PoolConfig;
use crate::stratum::algorithms::{target_to_f64, Algorithms};
use crate::stratum::emission::{BlockType, ManagerEvents, ShareRecord};
use crate::stratum::error::ShareError;
use crate::stratum::session::{MinerClient, ShareSubmission};
use crate::stratum::util::is_hex;
use crate::stratum::work::block_template::BlockTemplate;
use crate::stratum::work::counters::{ExtraNonceCounter, JobCounter, EXTRA_NONCE1_SIZE};
use crate::stratum::work::error::WorkError;
use crate::stratum::work::template::{Job, JobParams};
use crate::utils::time_provider::TimeProvider;
use bitcoin::Target;
use num_bigint::BigUint;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// Placeholder reserved in the coinbase for extranonce1
const EXTRA_NONCE_PLACEHOLDER: [u8; 2] = [0xf0, 0x00];

/// Shares below this fraction of the miner's difficulty are rejected
const SHARE_DIFFICULTY_TOLERANCE: f64 = 0.99;

const MIX_HASH_HEX_LENGTH: usize = 64;
const NONCE_HEX_LENGTH: usize = 16;

/// Leading hex characters of the miner's assigned extranonce1 the nonce must start with
const NONCE_RANGE_PREFIX_LENGTH: usize = 4;

/// The current job and every job shares are still accepted for.
#[derive(Debug, Default)]
struct JobTable {
    current: Option<Arc<Job>>,
    valid: HashMap<String, Arc<Job>>,
}

/// Result of an accepted share
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedShare {
    /// Block hash, reversed hex
    pub hash: String,
    /// The serialized block as hex, ready for submitblock when `block_valid`
    pub hex: String,
    pub block_valid: bool,
}

/// Turns block templates into jobs and validates shares against them.
///
/// All operations take `&self` so one manager can be shared between the
/// template poller and every miner connection.
pub struct Manager {
    config: PoolConfig,
    algorithms: Algorithms,
    events: Arc<dyn ManagerEvents>,
    time_provider: Arc<dyn TimeProvider>,
    jobs: RwLock<JobTable>,
    job_counter: JobCounter,
    extra_nonce_counter: ExtraNonceCounter,
    extra_nonce_placeholder: Vec<u8>,
    extra_nonce2_size: usize,
}

impl Manager {
    pub fn new(
        config: PoolConfig,
        algorithms: Algorithms,
        events: Arc<dyn ManagerEvents>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Result<Self, WorkError> {
        Self::with_extra_nonce_counter(
            config,
            algorithms,
            events,
            time_provider,
            ExtraNonceCounter::new(EXTRA_NONCE1_SIZE),
        )
    }

    pub fn with_extra_nonce_counter(
        config: PoolConfig,
        algorithms: Algorithms,
        events: Arc<dyn ManagerEvents>,
        time_provider: Arc<dyn TimeProvider>,
        extra_nonce_counter: ExtraNonceCounter,
    ) -> Result<Self, WorkError> {
        let extra_nonce_placeholder = EXTRA_NONCE_PLACEHOLDER.to_vec();
        let extra_nonce2_size = extra_nonce_placeholder
            .len()
            .checked_sub(extra_nonce_counter.size())
            .ok_or_else(|| {
                WorkError::InvalidConfig(format!(
                    "extranonce1 size {} exceeds the {} byte placeholder",
                    extra_nonce_counter.size(),
                    extra_nonce_placeholder.len()
                ))
            })?;
        Ok(Self {
            config,
            algorithms,
            events,
            time_provider,
            jobs: RwLock::new(JobTable::default()),
            job_counter: JobCounter::new(),
            extra_nonce_counter,
            extra_nonce_placeholder,
            extra_nonce2_size,
        })
    }

    pub fn extra_nonce2_size(&self) -> usize {
        self.extra_nonce2_size
    }

    pub fn extra_nonce_counter(&self) -> &ExtraNonceCounter {
        &self.extra_nonce_counter
    }

    pub fn current_job(&self) -> Option<Arc<Job>> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .clone()
    }

    pub fn valid_job(&self, job_id: &str) -> Option<Arc<Job>> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .valid
            .get(job_id)
            .cloned()
    }

    pub fn valid_job_count(&self) -> usize {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .valid
            .len()
    }

    /// Notify parameters of the current job for a miner
    pub fn job_parameters(
        &self,
        client: &mut MinerClient,
        clean_jobs: bool,
    ) -> Option<Result<JobParams, WorkError>> {
        self.current_job()
            .map(|job| job.build_job_parameters(client, clean_jobs, &self.extra_nonce_counter))
    }

    fn build_job(&self, template: BlockTemplate) -> Result<Arc<Job>, WorkError> {
        let job = Job::new(
            self.job_counter.next(),
            &self.config,
            &self.algorithms,
            template,
            &self.extra_nonce_placeholder,
            self.time_provider.as_ref(),
        )?;
        Ok(Arc::new(job))
    }

    /// Build a job for an updated template on the same chain tip.
    ///
    /// Earlier jobs stay valid so in flight shares are still accepted.
    pub fn handle_updates(&self, template: BlockTemplate) -> Result<bool, WorkError> {
        let job = self.build_job(template)?;
        {
            let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
            jobs.current = Some(job.clone());
            jobs.valid.insert(job.job_id.clone(), job.clone());
        }
        debug!("Updated job {} at height {}", job.job_id, job.height());
        self.events.on_job_updated(job);
        Ok(true)
    }

    fn is_new_block(&self, template: &BlockTemplate) -> bool {
        match self.current_job() {
            None => true,
            Some(current) => {
                template.height >= current.template.height
                    && (current.template.previousblockhash != template.previousblockhash
                        || current.template.bits != template.bits)
            }
        }
    }

    /// Build a job when the template moves the chain tip, or when forced.
    ///
    /// Returns false, leaving all state untouched, when the template is
    /// neither new nor forced. A new job replaces every valid job.
    pub fn handle_template(
        &self,
        template: BlockTemplate,
        force_new_block: bool,
    ) -> Result<bool, WorkError> {
        if !self.is_new_block(&template) && !force_new_block {
            return Ok(false);
        }
        let job = self.build_job(template)?;
        {
            let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
            jobs.valid = HashMap::from([(job.job_id.clone(), job.clone())]);
            jobs.current = Some(job.clone());
        }
        info!(
            "New block job {} at height {} on {}",
            job.job_id,
            job.height(),
            job.template.previousblockhash
        );
        self.events.on_new_block(job);
        Ok(true)
    }

    fn reject(
        &self,
        job_id: &str,
        client: &MinerClient,
        error: ShareError,
    ) -> Result<AcceptedShare, ShareError> {
        debug!(
            "Rejected share from {} for job {}: {}",
            client.id, job_id, error
        );
        let record = ShareRecord {
            job: job_id.to_string(),
            id: client.id.clone(),
            ip: client.ip.clone(),
            port: client.port,
            addr_primary: client.addr_primary.clone(),
            addr_auxiliary: client.addr_auxiliary.clone(),
            block_diff_primary: None,
            block_type: BlockType::Share,
            coinbase: None,
            difficulty: client.difficulty,
            hash: None,
            hex: None,
            header: None,
            header_diff: None,
            height: None,
            identifier: self.config.settings.identifier.clone(),
            reward: None,
            share_diff: None,
            error: Some(error.message()),
        };
        self.events.on_share_result(record, None, false);
        Err(error)
    }

    /// Check a submission's syntax, before any hashing is done
    fn check_submission(
        client: &MinerClient,
        submission: &ShareSubmission,
    ) -> Result<(), ShareError> {
        if !is_hex(&submission.header_hash) {
            return Err(ShareError::invalid("invalid header submission [1]"));
        }
        if !is_hex(&submission.mix_hash) {
            return Err(ShareError::invalid("invalid mixHash submission"));
        }
        if !is_hex(&submission.nonce) {
            return Err(ShareError::invalid("invalid nonce submission"));
        }
        if submission.mix_hash.len() != MIX_HASH_HEX_LENGTH {
            return Err(ShareError::invalid("incorrect size of mixHash"));
        }
        if submission.nonce.len() != NONCE_HEX_LENGTH {
            return Err(ShareError::invalid("incorrect size of nonce"));
        }
        let assigned = client
            .extra_nonce1
            .as_deref()
            .unwrap_or_default()
            .to_ascii_lowercase();
        let range_prefix = assigned
            .get(..NONCE_RANGE_PREFIX_LENGTH)
            .unwrap_or(assigned.as_str());
        if range_prefix.is_empty()
            || !submission
                .nonce
                .to_ascii_lowercase()
                .starts_with(range_prefix)
        {
            return Err(ShareError::NonceOutOfRange);
        }
        if client.addr_primary.as_deref().unwrap_or_default().is_empty() {
            return Err(ShareError::invalid("worker address isn't set properly"));
        }
        Ok(())
    }

    /// Validate a share submitted for a job.
    ///
    /// Every outcome, accepted or rejected, is reported through
    /// `on_share_result`.
    pub fn handle_share(
        &self,
        job_id: &str,
        client: &MinerClient,
        submission: &ShareSubmission,
    ) -> Result<AcceptedShare, ShareError> {
        let Some(job) = self.valid_job(job_id) else {
            return self.reject(job_id, client, ShareError::JobNotFound);
        };
        if let Err(error) = Self::check_submission(client, submission) {
            return self.reject(job_id, client, error);
        }
        if !job.record_submission(&submission.dedup_parts()) {
            return self.reject(job_id, client, ShareError::DuplicateShare);
        }

        let Ok(extra_nonce1) = hex::decode(&submission.extra_nonce1) else {
            return self.reject(job_id, client, ShareError::invalid("invalid header submission [2]"));
        };
        let (coinbase, header, header_hash) = job.header_for(&extra_nonce1);
        let header_hash_hex = hex::encode(header_hash);
        if !header_hash_hex.eq_ignore_ascii_case(&submission.header_hash) {
            return self.reject(job_id, client, ShareError::invalid("invalid header submission [2]"));
        }

        // Lengths and hex syntax were checked above
        let (Ok(nonce), Ok(mix_hash)) = (
            u64::from_str_radix(&submission.nonce, 16),
            <[u8; 32]>::try_from(hex::decode(&submission.mix_hash).unwrap_or_default()),
        ) else {
            return self.reject(job_id, client, ShareError::invalid("submission is not valid"));
        };
        let outcome = self
            .algorithms
            .firopow(&header_hash, nonce, job.height(), &mix_hash);
        if !outcome.valid {
            return self.reject(job_id, client, ShareError::invalid("submission is not valid"));
        }

        let firopow = &self.algorithms.firopow;
        let digest = Target::from_be_bytes(outcome.digest);
        let share_diff = firopow.diff_f64() / target_to_f64(&digest) * firopow.multiplier;
        let block_diff_primary = job.difficulty * firopow.multiplier;

        let nonce_bytes = nonce.to_le_bytes();
        let block_hash = hex::encode(job.block_hash(&header, &nonce_bytes, &mix_hash));
        let block_hex = hex::encode(job.serialize_block(&header, &coinbase, &nonce_bytes, &mix_hash));

        let mut difficulty = client.difficulty;
        let block_valid = job.target >= digest;
        if !block_valid && share_diff / difficulty < SHARE_DIFFICULTY_TOLERANCE {
            match client
                .previous_difficulty
                .filter(|previous| *previous > 0.0 && share_diff >= *previous)
            {
                Some(previous) => difficulty = previous,
                None => {
                    return self.reject(job_id, client, ShareError::LowDifficulty(share_diff));
                }
            }
        }

        let primary = ShareRecord {
            job: job_id.to_string(),
            id: client.id.clone(),
            ip: client.ip.clone(),
            port: client.port,
            addr_primary: client.addr_primary.clone(),
            addr_auxiliary: client.addr_auxiliary.clone(),
            block_diff_primary: Some(block_diff_primary),
            block_type: if block_valid {
                BlockType::Primary
            } else {
                BlockType::Share
            },
            coinbase: Some(hex::encode(&coinbase)),
            difficulty,
            hash: Some(block_hash.clone()),
            hex: Some(block_hex.clone()),
            header: Some(header_hash_hex),
            header_diff: Some(BigUint::from_bytes_be(&outcome.digest).to_string()),
            height: Some(job.height()),
            identifier: self.config.settings.identifier.clone(),
            reward: Some(job.template.coinbasevalue),
            share_diff: Some(format!("{share_diff:.8}")),
            error: None,
        };
        let auxiliary = ShareRecord {
            block_type: BlockType::Auxiliary,
            height: None,
            reward: None,
            ..primary.clone()
        };

        if block_valid {
            info!(
                "Block candidate {} at height {} from {}",
                block_hash,
                job.height(),
                client.id
            );
        }
        self.events
            .on_share_result(primary, Some(auxiliary), block_valid);
        Ok(AcceptedShare {
            hash: block_hash,
            hex: block_hex,
            block_valid,
        })
    }
}
