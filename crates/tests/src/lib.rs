//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 端到端测试：channel feed -> FeedDriver -> Dispatcher -> worker pools
//!   -> 磁盘文件 / mock API 记录

#[cfg(test)]
mod contract_tests {
    use contracts::{ConfigVersion, WorkerKind};

    #[test]
    fn test_contracts_compile() {
        let _ = ConfigVersion::V1;
        assert_eq!(WorkerKind::ALL.len(), 3);
    }

    #[test]
    fn test_worker_kind_prefixes_are_distinct() {
        let prefixes: std::collections::HashSet<_> =
            WorkerKind::ALL.iter().map(|k| k.task_prefix()).collect();
        assert_eq!(prefixes.len(), WorkerKind::ALL.len());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::Path;
    use std::sync::Arc;

    use clients::{MockApiConfig, MockMediaFetcher, MockStatusApi, PostedStatus};
    use contracts::{ContractError, SubscriptionConfig, TextEncoding, WorkerKind};
    use dispatcher::{
        read_status_file, Dispatcher, DispatcherError, MediaDownloadProcessor, MirrorProcessor,
        QueueRegistry, WorkerExit, WorkerOptions, WorkerPool, WriterProcessor,
    };
    use feed::{ChannelFeed, FeedDriver, StopReason, Subscription};
    use serde_json::{json, Value};

    const PIC_URL: &str = "https://pbs.example.com/media/a.jpg";

    fn original(id: u64, user: u64) -> Value {
        json!({
            "id": id,
            "text": format!("status {id} https://t.co/abc  done"),
            "user": { "id": user, "screen_name": format!("user{user}") },
        })
    }

    fn with_picture(id: u64, user: u64) -> Value {
        let mut payload = original(id, user);
        payload["extended_entities"] = json!({
            "media": [{ "id": 900 + id, "media_url_https": PIC_URL, "type": "photo" }]
        });
        payload
    }

    fn reply(id: u64) -> Value {
        json!({
            "id": id,
            "text": "@bob thanks",
            "user": { "id": 10 },
            "in_reply_to_user_id": 5,
            "entities": { "user_mentions": [{ "id": 5, "screen_name": "bob" }] },
        })
    }

    fn reshare(id: u64, of: Value) -> Value {
        json!({
            "id": id,
            "text": "RT @user10: status",
            "user": { "id": 11 },
            "retweeted_status": of,
        })
    }

    async fn stop_and_join(pool: WorkerPool) -> Vec<Result<WorkerExit, DispatcherError>> {
        pool.stop().unwrap();
        pool.join().await
    }

    /// 完整数据流：
    /// 1. ChannelFeed 注入 status / limit / 空 payload
    /// 2. FeedDriver 分类并回调 Dispatcher
    /// 3. Dispatcher 按配置顺序扇出到三个队列
    /// 4. 各 worker 池处理后停止并 join
    #[tokio::test]
    async fn test_e2e_channel_feed_to_pools() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let media_dir = dir.path().join("media");
        let tmp = dir.path().join("tmp");

        let api = Arc::new(MockStatusApi::new());
        let fetcher = Arc::new(MockMediaFetcher::new().with_body(PIC_URL, "JPEG"));

        let mut registry = QueueRegistry::new();
        let writer = WorkerPool::spawn(
            WriterProcessor::new(&out).with_encoding(TextEncoding::Utf8),
            2,
            &mut registry,
            WorkerOptions::default(),
        )
        .unwrap();
        let mirror = WorkerPool::spawn(
            MirrorProcessor::new(Arc::clone(&api), Arc::clone(&fetcher), &tmp),
            1,
            &mut registry,
            WorkerOptions::default(),
        )
        .unwrap();
        let media = WorkerPool::spawn(
            MediaDownloadProcessor::new(Arc::clone(&fetcher), &media_dir),
            1,
            &mut registry,
            WorkerOptions::default(),
        )
        .unwrap();

        let kinds = [WorkerKind::Writer, WorkerKind::Mirror, WorkerKind::MediaDownloader];
        let dispatcher = Dispatcher::from_registry(&registry, &kinds).unwrap();

        let (tx, mut source) = ChannelFeed::new();
        tx.connect().unwrap();
        tx.payload(with_picture(1, 10)).unwrap();
        tx.payload(reply(2)).unwrap();
        tx.payload(reshare(3, original(1, 10))).unwrap();
        tx.payload(json!({ "limit": { "track": 4 } })).unwrap();
        tx.payload(json!({})).unwrap();
        drop(tx);

        let stats = FeedDriver::new().run(&mut source, &dispatcher).await.unwrap();
        assert_eq!(stats.statuses, 3);
        assert_eq!(stats.limits, 1);
        assert_eq!(stats.empty, 1);
        assert_eq!(stats.stop_reason, StopReason::Exhausted);

        let dispatch = dispatcher.stats();
        assert_eq!(dispatch.received, 3);
        assert_eq!(dispatch.enqueued, 9);
        assert_eq!(dispatch.failed, 0);

        for pool in [writer, mirror, media] {
            let exits = stop_and_join(pool).await;
            assert!(exits
                .iter()
                .all(|e| matches!(e, Ok(WorkerExit::Stopped { .. }))));
        }

        // writer: 转发不落盘
        assert!(out.join("status_1.json").exists());
        assert!(out.join("status_2.json").exists());
        assert!(!out.join("status_3.json").exists());
        let saved = read_status_file(&out.join("status_1.json"), TextEncoding::Utf8).unwrap();
        assert_eq!(saved["id"], json!(1));
        assert_eq!(saved["user"]["id"], json!(10));

        // mirror: 只有原创、非回复的 status
        assert_eq!(
            api.posts(),
            vec![PostedStatus {
                text: "status 1 done".to_string(),
                media: vec![tmp.join("a.jpg")],
            }]
        );

        // media downloader: 每个 status 一个子目录
        let pic = media_dir.join("media_1").join("a.jpg");
        assert_eq!(std::fs::read(&pic).unwrap(), b"JPEG");
        assert!(!media_dir.join("media_3").exists());
    }

    #[tokio::test]
    async fn test_e2e_rate_limit_ends_mirror_worker() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(MockStatusApi::with_config(MockApiConfig::rate_limit_after(1)));
        let fetcher = Arc::new(MockMediaFetcher::new());

        let mut registry = QueueRegistry::new();
        let mirror = WorkerPool::spawn(
            MirrorProcessor::new(Arc::clone(&api), fetcher, dir.path()),
            1,
            &mut registry,
            WorkerOptions::default(),
        )
        .unwrap();
        let queue = Arc::clone(mirror.queue());
        let dispatcher = Dispatcher::from_registry(&registry, &[WorkerKind::Mirror]).unwrap();

        let (tx, mut source) = ChannelFeed::new();
        for id in 1..=3 {
            tx.payload(original(id, 10)).unwrap();
        }
        drop(tx);
        FeedDriver::new().run(&mut source, &dispatcher).await.unwrap();

        let exits = stop_and_join(mirror).await;
        assert!(matches!(
            exits.as_slice(),
            [Err(DispatcherError::Contract(ContractError::RateLimited { .. }))]
        ));
        assert_eq!(api.posts().len(), 1);
        assert_eq!(api.attempts(), 2);
        // status 3 与 poison 仍在队列中
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test]
    async fn test_e2e_subscription_and_drain_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = QueueRegistry::new();
        let writer = WorkerPool::spawn(
            WriterProcessor::new(dir.path()),
            1,
            &mut registry,
            WorkerOptions::default().with_drain_limit(Some(2)).unwrap(),
        )
        .unwrap();
        let queue = Arc::clone(writer.queue());
        let dispatcher = Dispatcher::from_registry(&registry, &[WorkerKind::Writer]).unwrap();

        let (tx, mut source) = ChannelFeed::new();
        for (id, user) in [(1, 10), (2, 11), (3, 10), (4, 10)] {
            tx.payload(original(id, user)).unwrap();
        }
        drop(tx);

        let subscription = Subscription::new(&SubscriptionConfig {
            follow: vec![10],
            track: Vec::new(),
        });
        let stats = FeedDriver::new()
            .with_subscription(subscription)
            .run(&mut source, &dispatcher)
            .await
            .unwrap();
        assert_eq!(stats.statuses, 3);
        assert_eq!(stats.filtered, 1);

        let exits = stop_and_join(writer).await;
        assert!(matches!(
            exits.as_slice(),
            [Ok(WorkerExit::DrainLimit { processed: 2 })]
        ));
        assert!(dir.path().join("status_1.json").exists());
        assert!(dir.path().join("status_3.json").exists());
        assert!(!dir.path().join("status_2.json").exists());
        assert!(!dir.path().join("status_4.json").exists());
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test]
    async fn test_e2e_dry_run_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(MockMediaFetcher::new().serve_any("x"));
        let api = Arc::new(MockStatusApi::new());
        let dry = WorkerOptions::default().with_dry_run(true);

        let mut registry = QueueRegistry::new();
        let pools = vec![
            WorkerPool::spawn(
                WriterProcessor::new(dir.path().join("out")),
                1,
                &mut registry,
                dry.clone(),
            )
            .unwrap(),
            WorkerPool::spawn(
                MirrorProcessor::new(Arc::clone(&api), Arc::clone(&fetcher), dir.path().join("tmp")),
                1,
                &mut registry,
                dry.clone(),
            )
            .unwrap(),
            WorkerPool::spawn(
                MediaDownloadProcessor::new(Arc::clone(&fetcher), dir.path().join("media")),
                1,
                &mut registry,
                dry,
            )
            .unwrap(),
        ];
        let dispatcher = Dispatcher::from_registry(&registry, &registry.kinds()).unwrap();

        let (tx, mut source) = ChannelFeed::new();
        tx.payload(with_picture(7, 10)).unwrap();
        drop(tx);
        FeedDriver::new().run(&mut source, &dispatcher).await.unwrap();

        for pool in pools {
            for exit in stop_and_join(pool).await {
                assert_eq!(exit.unwrap().processed(), 1);
            }
        }

        assert!(api.posts().is_empty());
        assert!(fetcher.requests().is_empty());
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    /// 配置驱动：过滤链由 TOML 声明
    #[tokio::test]
    async fn test_e2e_configured_filter_chain() {
        let dir = tempfile::tempdir().unwrap();
        let toml = format!(
            r#"
[[workers]]
kind = "writer"
pool_size = 1
dirname = "{}"
format = "{{user.id}}_{{id}}.json"
filters = [{{ kind = "default" }}, {{ kind = "not", filter = {{ kind = "has_media" }} }}]
"#,
            dir.path().display()
        );
        let blueprint =
            config_loader::ConfigLoader::load_from_str(&toml, config_loader::ConfigFormat::Toml)
                .unwrap();
        let config = blueprint.worker(WorkerKind::Writer).unwrap();

        let mut registry = QueueRegistry::new();
        let options = WorkerOptions::from_config::<WriterProcessor>(
            config,
            blueprint.pipeline.dry_run,
        )
        .unwrap();
        let writer = WorkerPool::spawn(
            WriterProcessor::from_config(config),
            config.pool_size,
            &mut registry,
            options,
        )
        .unwrap();
        let dispatcher =
            Dispatcher::from_registry(&registry, &blueprint.worker_kinds()).unwrap();

        let (tx, mut source) = ChannelFeed::new();
        tx.payload(original(1, 10)).unwrap();
        tx.payload(with_picture(2, 10)).unwrap();
        tx.payload(reshare(3, original(1, 10))).unwrap();
        drop(tx);
        FeedDriver::new().run(&mut source, &dispatcher).await.unwrap();
        stop_and_join(writer).await;

        let written: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(written, vec!["10_1.json".to_string()]);
        assert!(is_utf32_le(&dir.path().join("10_1.json")));
    }

    fn is_utf32_le(path: &Path) -> bool {
        std::fs::read(path)
            .map(|bytes| bytes.starts_with(&[0xFF, 0xFE, 0x00, 0x00]))
            .unwrap_or(false)
    }
}
