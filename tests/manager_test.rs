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

mod common;

#[cfg(test)]
mod tests {
    use super::common::{
        default_test_config, fixture_template, miner, share_digest, submission,
        FixedProofOfWork, FIXTURE_TIME, HEADER_HASH,
    };
    use firopool::config::PoolConfig;
    use firopool::stratum::algorithms::Algorithms;
    use firopool::stratum::emission::{BlockType, ChannelEvents, ManagerEvent};
    use firopool::stratum::error::ShareError;
    use firopool::stratum::work::block_template::AuxBlock;
    use firopool::stratum::work::counters::ExtraNonceCounter;
    use firopool::utils::time_provider::TestTimeProvider;
    use firopool::Manager;
    use std::io::Write;
    use std::sync::Arc;

    fn build_manager(config: PoolConfig, events: ChannelEvents) -> Manager {
        Manager::new(
            config,
            Algorithms::new(Arc::new(FixedProofOfWork {
                digest: share_digest(),
            })),
            Arc::new(events),
            Arc::new(TestTimeProvider::at(FIXTURE_TIME)),
        )
        .expect("Failed to create manager")
    }

    #[test_log::test(tokio::test)]
    async fn test_template_to_accepted_share() {
        let (events, mut rx) = ChannelEvents::new(16);
        let manager = build_manager(default_test_config(), events);

        assert_eq!(manager.handle_template(fixture_template(), false), Ok(true));
        match rx.recv().await {
            Some(ManagerEvent::NewBlock(job)) => assert_eq!(job.job_id, "1"),
            other => panic!("expected a new block event, got {other:?}"),
        }

        let mut client = miner("0000", 0.00000005);
        client.extra_nonce1 = None;
        let params = manager
            .job_parameters(&mut client, true)
            .expect("No current job")
            .expect("Failed to build job parameters");
        let extra_nonce1 = client.extra_nonce1.clone().expect("extranonce1 not assigned");
        assert_eq!(extra_nonce1.len(), 4);
        assert_eq!(params.seed_hash, "00".repeat(32));

        let nonce = format!("{extra_nonce1}000000000001");
        let share = submission(&extra_nonce1, &nonce, &params.header_hash);
        let accepted = manager
            .handle_share(&params.job_id, &client, &share)
            .expect("Share should be accepted");
        assert!(!accepted.block_valid);
        assert_eq!(accepted.hash.len(), 64);

        match rx.recv().await {
            Some(ManagerEvent::ShareResult {
                primary,
                auxiliary,
                block_valid,
            }) => {
                assert_eq!(primary.block_type, BlockType::Share);
                assert_eq!(primary.identifier, "firopool-test");
                assert_eq!(primary.share_diff.as_deref(), Some("0.00000006"));
                assert_eq!(primary.hex.as_deref(), Some(accepted.hex.as_str()));
                assert_eq!(auxiliary.map(|aux| aux.block_type), Some(BlockType::Auxiliary));
                assert!(!block_valid);
            }
            other => panic!("expected a share result, got {other:?}"),
        }

        assert_eq!(
            manager.handle_share(&params.job_id, &client, &share),
            Err(ShareError::DuplicateShare)
        );
        match rx.recv().await {
            Some(ManagerEvent::ShareResult { primary, .. }) => {
                assert_eq!(primary.error.as_deref(), Some("duplicate share"));
            }
            other => panic!("expected a share result, got {other:?}"),
        }
    }

    #[test]
    fn test_concurrent_duplicate_submissions() {
        let (events, _rx) = ChannelEvents::new(64);
        let manager = Arc::new(build_manager(default_test_config(), events));
        manager
            .handle_template(fixture_template(), false)
            .expect("Failed to handle template");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                std::thread::spawn(move || {
                    manager.handle_share(
                        "1",
                        &miner("b750", 0.00000005),
                        &submission("b750", "b7502aaaac75284c", HEADER_HASH),
                    )
                })
            })
            .collect();
        let results: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().expect("Thread panicked"))
            .collect();

        assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|result| **result == Err(ShareError::DuplicateShare))
                .count(),
            7
        );
    }

    #[test]
    fn test_extra_nonce_assignment_is_unique() {
        let (events, _rx) = ChannelEvents::new(4);
        let manager = Manager::with_extra_nonce_counter(
            default_test_config(),
            Algorithms::new(Arc::new(FixedProofOfWork {
                digest: share_digest(),
            })),
            Arc::new(events),
            Arc::new(TestTimeProvider::at(FIXTURE_TIME)),
            ExtraNonceCounter::with_start(2, 0x00ff),
        )
        .expect("Failed to create manager");
        manager
            .handle_template(fixture_template(), false)
            .expect("Failed to handle template");

        let mut first = miner("0000", 1.0);
        first.extra_nonce1 = None;
        let mut second = first.clone();

        let first_params = manager.job_parameters(&mut first, true).unwrap().unwrap();
        let second_params = manager.job_parameters(&mut second, true).unwrap().unwrap();
        assert_eq!(first.extra_nonce1.as_deref(), Some("0100"));
        assert_eq!(second.extra_nonce1.as_deref(), Some("0101"));
        assert_ne!(first_params.header_hash, second_params.header_hash);
    }

    #[test]
    fn test_merge_mined_job_from_config_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("Failed to create config file");
        writeln!(
            file,
            r#"
[settings]
testnet = false
identifier = "merge"

[primary]
address = "aKoefNw7AeYKosEYwjCi4RQpVhBWRwU5Mj"
recipients = [{{ address = "aKoefNw7AeYKosEYwjCi4RQpVhBWRwU5Mj", percentage = 0.05 }}]

[auxiliary]
enabled = true

[auxiliary.coin]
header = "fabe6d6d"
"#
        )
        .expect("Failed to write config file");

        let config = PoolConfig::load(file.path().to_str().expect("Invalid path"))
            .expect("Failed to load config");
        assert!(config.auxiliary_enabled());

        let aux_block: AuxBlock =
            serde_json::from_str(include_str!("test_data/gbt/firo/auxblock.json"))
                .expect("Failed to parse aux block");
        let template = fixture_template().with_aux_block(&aux_block);

        let (events, _rx) = ChannelEvents::new(4);
        let manager = build_manager(config, events);
        manager
            .handle_template(template, false)
            .expect("Failed to handle template");

        let job = manager.current_job().expect("No current job");
        let prefix = hex::encode(&job.generation.prefix);
        assert!(prefix.contains(
            "fabe6d6d8719aefb83ef6583bd4c808bbe7d49b629a60b375fc6e36bee039530bc7727e20100000000000000"
        ));
        // Pool output pays the reward minus the five percent recipient
        assert_eq!(hex::encode(&job.generation.suffix[5..13]), "fcf9d80800000000");
    }

    #[test]
    fn test_testnet_rejects_mainnet_pool_address() {
        let config = default_test_config().with_testnet(true);
        let (events, _rx) = ChannelEvents::new(4);
        let manager = build_manager(config, events);

        assert!(manager.handle_template(fixture_template(), false).is_err());
        assert!(manager.current_job().is_none());
    }
}
