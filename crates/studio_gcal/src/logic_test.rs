#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
    use mockall::mock;
    use std::sync::Arc;
    use studio_common::{
        Appointment, AppointmentStatus, AppointmentStore, CalendarConfig, CalendarConfigStore,
        HttpStatusCode, InMemoryAppointmentStore, InMemoryCalendarConfigStore, ServiceType,
        StudioError,
    };

    use crate::auth::TokenRefresher;
    use crate::logic::{DeleteResult, Reconciler, SyncError};
    use crate::mapper::{encode_event, MapperSettings};
    use crate::service::mock::MockCalendarProvider;
    use crate::service::{EventDateTime, RemoteEvent};

    mock! {
        pub Refresher {}

        #[async_trait]
        impl TokenRefresher for Refresher {
            async fn refresh_access_token(&self, refresh_token: &str) -> Result<String, SyncError>;
        }
    }

    fn refresher() -> MockRefresher {
        let mut refresher = MockRefresher::new();
        refresher
            .expect_refresh_access_token()
            .withf(|token| token == "refresh-1")
            .returning(|_| Ok("fresh-token".to_string()));
        refresher
    }

    fn connected() -> Arc<InMemoryCalendarConfigStore> {
        Arc::new(InMemoryCalendarConfigStore::new(CalendarConfig {
            access_token: None,
            refresh_token: Some("refresh-1".to_string()),
            calendar_id: None,
        }))
    }

    fn appointment(id: &str, client: &str, day: u32, event_id: Option<&str>) -> Appointment {
        Appointment {
            id: id.to_string(),
            appointment_date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            appointment_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            service_type: ServiceType::Video,
            client_name: client.to_string(),
            client_email: format!("{}@example.com", client.to_lowercase()),
            client_phone: None,
            client_company: None,
            notes: None,
            status: AppointmentStatus::Scheduled,
            external_event_id: event_id.map(str::to_string),
            created_at: Utc::now(),
        }
    }

    struct Harness {
        store: Arc<InMemoryAppointmentStore>,
        config: Arc<InMemoryCalendarConfigStore>,
        provider: Arc<MockCalendarProvider>,
        reconciler: Reconciler,
    }

    fn harness(
        appointments: Vec<Appointment>,
        config: Arc<InMemoryCalendarConfigStore>,
        refresher: MockRefresher,
        provider: MockCalendarProvider,
    ) -> Harness {
        let store = Arc::new(InMemoryAppointmentStore::with_appointments(appointments));
        let provider = Arc::new(provider);
        let reconciler = Reconciler::new(
            store.clone(),
            config.clone(),
            Arc::new(refresher),
            provider.clone(),
            MapperSettings::default(),
        );
        Harness {
            store,
            config,
            provider,
            reconciler,
        }
    }

    /// An event as we would have written it for `appointment`.
    fn our_event(id: &str, appointment: &Appointment) -> RemoteEvent {
        let payload = encode_event(appointment, &MapperSettings::default());
        RemoteEvent {
            id: id.to_string(),
            summary: Some(payload.summary),
            description: Some(payload.description),
            start: Some(payload.start),
            end: Some(payload.end),
            status: Some("confirmed".to_string()),
            attendees: payload.attendees,
        }
    }

    fn before_march() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    // --- push_one ---

    #[tokio::test]
    async fn test_push_one_already_synced_makes_no_calls() {
        let h = harness(
            vec![appointment("a1", "Ana", 10, Some("evt-old"))],
            connected(),
            MockRefresher::new(),
            MockCalendarProvider::new(),
        );

        let outcome = h.reconciler.push_one("a1").await.unwrap();

        assert_eq!(outcome.event_id, "evt-old");
        assert!(outcome.already_synced);
        assert_eq!(h.provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_push_one_links_created_event() {
        let h = harness(
            vec![appointment("a1", "Ana", 10, None)],
            connected(),
            refresher(),
            MockCalendarProvider::new(),
        );

        let outcome = h.reconciler.push_one("a1").await.unwrap();

        assert_eq!(outcome.event_id, "evt1");
        assert!(!outcome.already_synced);
        let stored = h.store.get("a1").await.unwrap().unwrap();
        assert_eq!(stored.external_event_id.as_deref(), Some("evt1"));
        assert_eq!(h.provider.created()[0].summary, "Captação - Ana");
    }

    #[tokio::test]
    async fn test_refreshed_token_is_persisted() {
        let h = harness(
            vec![appointment("a1", "Ana", 10, None)],
            connected(),
            refresher(),
            MockCalendarProvider::new(),
        );

        h.reconciler.push_one("a1").await.unwrap();

        let config = h.config.load().await.unwrap();
        assert_eq!(config.access_token.as_deref(), Some("fresh-token"));
        assert_eq!(config.refresh_token.as_deref(), Some("refresh-1"));
    }

    #[tokio::test]
    async fn test_push_one_unknown_appointment() {
        let h = harness(
            Vec::new(),
            connected(),
            MockRefresher::new(),
            MockCalendarProvider::new(),
        );

        let err = h.reconciler.push_one("missing").await.unwrap_err();
        assert!(matches!(err, SyncError::NotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn test_push_without_refresh_token_is_not_configured() {
        let h = harness(
            vec![appointment("a1", "Ana", 10, None)],
            Arc::new(InMemoryCalendarConfigStore::default()),
            MockRefresher::new(),
            MockCalendarProvider::new(),
        );

        let err = h.reconciler.push_one("a1").await.unwrap_err();

        assert!(matches!(err, SyncError::NotConfigured));
        assert_eq!(h.provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_refresh_failure_stops_before_the_provider() {
        let mut failing = MockRefresher::new();
        failing
            .expect_refresh_access_token()
            .times(1)
            .returning(|_| Err(SyncError::AuthRefresh("400: invalid_grant".to_string())));
        let h = harness(
            vec![appointment("a1", "Ana", 10, None)],
            connected(),
            failing,
            MockCalendarProvider::new(),
        );

        let err = h.reconciler.push_one("a1").await.unwrap_err();

        assert!(matches!(err, SyncError::AuthRefresh(_)));
        assert_eq!(h.provider.call_count(), 0);
        assert!(h.config.load().await.unwrap().access_token.is_none());
    }

    #[tokio::test]
    async fn test_lost_claim_skips_remote_create() {
        let h = harness(
            vec![appointment("a1", "Ana", 10, None)],
            connected(),
            refresher(),
            MockCalendarProvider::new(),
        );
        assert!(h
            .store
            .try_claim("a1", "other-worker", Utc::now(), Duration::minutes(10))
            .await
            .unwrap());

        let err = h.reconciler.push_one("a1").await.unwrap_err();

        assert!(matches!(err, SyncError::SyncInProgress(_)));
        assert_eq!(h.provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_create_releases_claim() {
        let h = harness(
            vec![appointment("a1", "Ana", 10, None)],
            connected(),
            refresher(),
            MockCalendarProvider::failing_for(&["Ana"]),
        );

        let err = h.reconciler.push_one("a1").await.unwrap_err();

        assert!(matches!(err, SyncError::ProviderRequest { status: 500, .. }));
        assert!(h.store.get("a1").await.unwrap().unwrap().external_event_id.is_none());
        assert!(h
            .store
            .try_claim("a1", "retry", Utc::now(), Duration::minutes(10))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_abandoned_claim_does_not_block_push() {
        let h = harness(
            vec![appointment("a1", "Ana", 10, None)],
            connected(),
            refresher(),
            MockCalendarProvider::new(),
        );
        let crashed_at = Utc::now() - Duration::minutes(30);
        assert!(h
            .store
            .try_claim("a1", "crashed-worker", crashed_at, Duration::minutes(10))
            .await
            .unwrap());

        let outcome = h.reconciler.push_one("a1").await.unwrap();

        assert_eq!(outcome.event_id, "evt1");
        assert_eq!(h.provider.created().len(), 1);
    }

    #[tokio::test]
    async fn test_claim_ttl_is_configurable() {
        let mut h = harness(
            vec![appointment("a1", "Ana", 10, None)],
            connected(),
            refresher(),
            MockCalendarProvider::new(),
        );
        let taken_at = Utc::now() - Duration::minutes(30);
        assert!(h
            .store
            .try_claim("a1", "slow-worker", taken_at, Duration::minutes(10))
            .await
            .unwrap());
        h.reconciler = h.reconciler.with_claim_ttl(Duration::hours(2));

        let err = h.reconciler.push_one("a1").await.unwrap_err();

        assert!(matches!(err, SyncError::SyncInProgress(_)));
        assert!(h.provider.created().is_empty());
    }

    #[tokio::test]
    async fn test_failed_link_surfaces_error_and_releases_claim() {
        // Another appointment already owns the id the provider hands back
        let h = harness(
            vec![
                appointment("a1", "Ana", 10, None),
                appointment("a2", "Bruno", 11, Some("evt1")),
            ],
            connected(),
            refresher(),
            MockCalendarProvider::new(),
        );

        let err = h.reconciler.push_one("a1").await.unwrap_err();

        assert!(matches!(err, SyncError::Store(StudioError::ConflictError(_))));
        assert_eq!(h.provider.created().len(), 1);
        let a1 = h.store.get("a1").await.unwrap().unwrap();
        assert!(a1.external_event_id.is_none());
        assert_eq!(a1.status, AppointmentStatus::Scheduled);
        assert!(h
            .store
            .try_claim("a1", "retry", Utc::now(), Duration::minutes(10))
            .await
            .unwrap());
    }

    // --- push_all ---

    #[tokio::test]
    async fn test_push_all_continues_after_item_failure() {
        let h = harness(
            vec![
                appointment("a1", "Ana", 10, None),
                appointment("a2", "Bruno", 11, None),
                appointment("a3", "Carla", 12, None),
            ],
            connected(),
            refresher(),
            MockCalendarProvider::failing_for(&["Bruno"]),
        );

        let report = h.reconciler.push_all().await.unwrap();

        assert_eq!(report.synced, 2);
        assert_eq!(report.failed, 1);
        let ids: Vec<&str> = report.results.iter().map(|r| r.appointment_id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2", "a3"]);
        assert!(!report.results[1].success);
        assert!(report.results[1].error.is_some());
        assert_eq!(report.results[2].event_id.as_deref(), Some("evt2"));
        assert_eq!(h.provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_push_all_counts_linked_as_synced() {
        let mut cancelled = appointment("a3", "Carla", 12, None);
        cancelled.status = AppointmentStatus::Cancelled;
        let h = harness(
            vec![
                appointment("a1", "Ana", 10, Some("evt-old")),
                appointment("a2", "Bruno", 11, None),
                cancelled,
            ],
            connected(),
            refresher(),
            MockCalendarProvider::new(),
        );

        let report = h.reconciler.push_all().await.unwrap();

        assert_eq!(report.synced, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(report.results.len(), 2);
        assert_eq!(h.provider.created().len(), 1);
    }

    // --- delete_one ---

    #[tokio::test]
    async fn test_delete_unsynced_is_a_no_op() {
        let h = harness(
            vec![appointment("a1", "Ana", 10, None)],
            connected(),
            MockRefresher::new(),
            MockCalendarProvider::new(),
        );

        assert_eq!(h.reconciler.delete_one("a1").await.unwrap(), DeleteResult::NotSynced);
        assert_eq!(h.provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_of_vanished_event_succeeds() {
        let h = harness(
            vec![appointment("a1", "Ana", 10, Some("evt9"))],
            connected(),
            refresher(),
            MockCalendarProvider::new(),
        );

        assert_eq!(h.reconciler.delete_one("a1").await.unwrap(), DeleteResult::AlreadyGone);
        assert_eq!(h.provider.deleted(), vec!["evt9".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_existing_event() {
        let a1 = appointment("a1", "Ana", 10, Some("evt1"));
        let provider = MockCalendarProvider::with_events(vec![our_event("evt1", &a1)]);
        let h = harness(vec![a1], connected(), refresher(), provider);

        assert_eq!(h.reconciler.delete_one("a1").await.unwrap(), DeleteResult::Deleted);
    }

    // --- pull_and_merge ---

    #[tokio::test]
    async fn test_pull_ignores_foreign_events() {
        let foreign = RemoteEvent {
            id: "x1".to_string(),
            summary: Some("Dentist".to_string()),
            start: Some(EventDateTime {
                date_time: Some("2025-03-10T09:00:00-03:00".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let h = harness(
            Vec::new(),
            connected(),
            refresher(),
            MockCalendarProvider::with_events(vec![foreign]),
        );

        let report = h.reconciler.pull_and_merge_at(before_march()).await.unwrap();

        assert_eq!(report.imported, 0);
        assert_eq!(report.skipped_foreign, 1);
        assert!(h.store.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pull_imports_unknown_events_once() {
        let remote = our_event("evt7", &appointment("ignored", "Diego", 15, None));
        let h = harness(
            Vec::new(),
            connected(),
            refresher(),
            MockCalendarProvider::with_events(vec![remote]),
        );

        let first = h.reconciler.pull_and_merge_at(before_march()).await.unwrap();
        let second = h.reconciler.pull_and_merge_at(before_march()).await.unwrap();

        assert_eq!(first.imported, 1);
        assert_eq!(second.imported, 0);
        assert_eq!(second.skipped_known, 1);
        let stored = h.store.list(None).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].client_name, "Diego");
        assert_eq!(stored[0].external_event_id.as_deref(), Some("evt7"));
        assert_eq!(stored[0].appointment_date, NaiveDate::from_ymd_opt(2025, 3, 15).unwrap());
    }

    #[tokio::test]
    async fn test_pull_cancels_appointment_whose_event_vanished() {
        let a1 = appointment("a1", "Ana", 10, Some("evt1"));
        let a2 = appointment("a2", "Bruno", 11, Some("evt2"));
        let provider = MockCalendarProvider::with_events(vec![our_event("evt1", &a1)]);
        let h = harness(vec![a1, a2], connected(), refresher(), provider);

        let report = h.reconciler.pull_and_merge_at(before_march()).await.unwrap();

        assert_eq!(report.cancelled, 1);
        assert_eq!(report.skipped_known, 1);
        let a1 = h.store.get("a1").await.unwrap().unwrap();
        let a2 = h.store.get("a2").await.unwrap().unwrap();
        assert_eq!(a1.status, AppointmentStatus::Scheduled);
        assert_eq!(a2.status, AppointmentStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_pull_cancels_past_appointment_whose_event_vanished() {
        let h = harness(
            vec![
                appointment("a2", "Bruno", 5, Some("evt2")),
                appointment("a3", "Carla", 20, None),
            ],
            connected(),
            refresher(),
            MockCalendarProvider::new(),
        );
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();

        let report = h.reconciler.pull_and_merge_at(now).await.unwrap();

        assert_eq!(report.cancelled, 1);
        let a2 = h.store.get("a2").await.unwrap().unwrap();
        assert_eq!(a2.status, AppointmentStatus::Cancelled);
        // Unlinked appointments are never judged
        let a3 = h.store.get("a3").await.unwrap().unwrap();
        assert_eq!(a3.status, AppointmentStatus::Scheduled);
        // 2025-03-05 10:00 in São Paulo
        assert_eq!(
            h.provider.last_time_min(),
            Some(Utc.with_ymd_and_hms(2025, 3, 5, 13, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_pull_keeps_past_appointment_whose_event_still_exists() {
        let a1 = appointment("a1", "Ana", 10, Some("evt1"));
        let provider = MockCalendarProvider::with_events(vec![our_event("evt1", &a1)]);
        let h = harness(vec![a1], connected(), refresher(), provider);
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();

        let report = h.reconciler.pull_and_merge_at(now).await.unwrap();

        assert_eq!(report.cancelled, 0);
        assert_eq!(report.skipped_known, 1);
        let a1 = h.store.get("a1").await.unwrap().unwrap();
        assert_eq!(a1.status, AppointmentStatus::Scheduled);
    }

    #[tokio::test]
    async fn test_pull_window_starts_now_without_linked_appointments() {
        let h = harness(
            vec![appointment("a1", "Ana", 10, None)],
            connected(),
            refresher(),
            MockCalendarProvider::new(),
        );
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();

        h.reconciler.pull_and_merge_at(now).await.unwrap();

        assert_eq!(h.provider.last_time_min(), Some(now));
    }

    #[tokio::test]
    async fn test_pull_does_not_import_events_that_already_ended() {
        let old = our_event("evt8", &appointment("ignored", "Diego", 15, None));
        let h = harness(
            Vec::new(),
            connected(),
            refresher(),
            MockCalendarProvider::with_events(vec![old]),
        );
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();

        let report = h.reconciler.pull_and_merge_at(now).await.unwrap();

        assert_eq!(report.imported, 0);
        assert_eq!(report.skipped_past, 1);
        assert!(h.store.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pull_treats_cancelled_remote_event_as_gone() {
        let a1 = appointment("a1", "Ana", 10, Some("evt1"));
        let mut remote = our_event("evt1", &a1);
        remote.status = Some("cancelled".to_string());
        let h = harness(
            vec![a1],
            connected(),
            refresher(),
            MockCalendarProvider::with_events(vec![remote]),
        );

        let report = h.reconciler.pull_and_merge_at(before_march()).await.unwrap();

        assert_eq!(report.cancelled, 1);
        assert_eq!(report.imported, 0);
    }

    #[tokio::test]
    async fn test_pull_counts_undecodable_events_as_failed() {
        let broken = RemoteEvent {
            id: "evt5".to_string(),
            summary: Some("Captação - Eva".to_string()),
            description: Some("[booking:v9]\nservice=video\n[/booking]".to_string()),
            start: Some(EventDateTime {
                date_time: Some("2025-03-20T10:00:00-03:00".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let h = harness(
            Vec::new(),
            connected(),
            refresher(),
            MockCalendarProvider::with_events(vec![broken]),
        );

        let report = h.reconciler.pull_and_merge_at(before_march()).await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.imported, 0);
    }

    // --- error mapping ---

    #[test]
    fn test_sync_errors_map_to_http_statuses() {
        let cases = [
            (SyncError::NotConfigured, 503),
            (SyncError::NotFound("a1".to_string()), 404),
            (SyncError::SyncInProgress("a1".to_string()), 409),
            (SyncError::AuthRefresh("invalid_grant".to_string()), 502),
            (
                SyncError::ProviderRequest {
                    status: 403,
                    message: "forbidden".to_string(),
                },
                502,
            ),
            (SyncError::Store(StudioError::DatabaseError("down".to_string())), 500),
        ];
        for (err, expected) in cases {
            let studio: StudioError = err.into();
            assert_eq!(studio.status_code(), expected, "{:?}", studio);
        }
    }
}
