use vidmeta_db::prelude::*;

async fn session() -> DbSession {
    let config = BackendConfig::new(Backend::Sqlite, ":memory:", "main");
    DbSession::connect(config).await.expect("in-memory connect")
}

async fn seeded_session() -> DbSession {
    let mut session = session().await;
    session
        .execute(
            "CREATE TABLE sequences (
                seqname TEXT,
                location TEXT,
                seqtyp SEQTYPE,
                vid_fps REAL,
                vid_frames INTEGER,
                tags TEXT,
                rt_box BOX,
                created TIMESTAMP,
                payload BLOB
            );",
            &[],
        )
        .await
        .expect("create table");
    session
}

#[tokio::test]
async fn insert_and_fetch_round_trip() {
    let mut session = seeded_session().await;

    let ts = chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(12, 30, 0)
        .unwrap();
    let mut builder = session.builder("sequences");
    builder.key_string("seqname", "cam01", None).unwrap();
    builder.key_string("location", "/data/cam01", None).unwrap();
    builder.key_seqtype("seqtyp", SeqType::Video, None).unwrap();
    builder.key_double("vid_fps", 25.0, None).unwrap();
    builder.key_int("vid_frames", 1500, None).unwrap();
    builder.key_int_array("tags", vec![3, 1, 4], None).unwrap();
    builder
        .key_region(
            "rt_box",
            BoundingBox::new(Point::new(640.0, 360.0), Point::new(0.0, 0.0)),
            None,
        )
        .unwrap();
    builder.key_timestamp("created", ts, None).unwrap();
    builder.key_blob("payload", vec![0xde, 0xad], None).unwrap();
    let insert = builder.insert_query(None).unwrap();
    let changed = session.execute(&insert, builder.params()).await.unwrap();
    assert_eq!(changed, 1);

    let mut query = session.builder("sequences");
    query.where_string("seqname", "cam01", "=", None).unwrap();
    let sql = query.select_query();
    let mut rows = session.result_set();
    let fetched = session.fetch(&sql, query.params(), &mut rows).await.unwrap();
    assert_eq!(fetched, 1);
    assert_eq!(rows.count_cols(), 9);

    assert!(rows.step());
    assert_eq!(rows.get_string_by_name("location").unwrap(), "/data/cam01");
    assert_eq!(rows.get_string_by_name("seqtyp").unwrap(), "video");
    assert!((rows.get_double_by_name("vid_fps").unwrap() - 25.0).abs() < f64::EPSILON);
    assert_eq!(rows.get_int_by_name("vid_frames").unwrap(), 1500);
    assert_eq!(rows.get_int_vec_by_name("tags").unwrap(), vec![3, 1, 4]);
    assert_eq!(
        rows.get_region_by_name("rt_box").unwrap(),
        BoundingBox::new(Point::new(640.0, 360.0), Point::new(0.0, 0.0))
    );
    assert_eq!(rows.get_timestamp_by_name("created").unwrap(), ts);
    assert_eq!(rows.get_blob_by_name("payload").unwrap(), vec![0xde, 0xad]);
    assert!(!rows.step());
}

#[tokio::test]
async fn empty_array_stays_distinguishable_from_missing() {
    let mut session = seeded_session().await;

    let mut builder = session.builder("sequences");
    builder.key_string("seqname", "cam02", None).unwrap();
    builder.key_int_array("tags", vec![], None).unwrap();
    let insert = builder.insert_query(None).unwrap();
    session.execute(&insert, builder.params()).await.unwrap();

    let mut rows = session.result_set();
    let direct = session.direct("SELECT tags FROM sequences;");
    session
        .fetch(&direct.generic_query().unwrap(), &[], &mut rows)
        .await
        .unwrap();
    assert!(rows.step());
    assert_eq!(rows.get_int_vec(0).unwrap(), Vec::<i32>::new());
}

#[tokio::test]
async fn composite_values_round_trip_as_text() {
    let mut session = session().await;
    session
        .execute(
            "CREATE TABLE intervals (t1 INTEGER, event VTEVENT, state PSTATE, features CVMAT);",
            &[],
        )
        .await
        .unwrap();

    let event = IntervalEvent {
        group_id: 1,
        class_id: 5,
        is_root: true,
        region: BoundingBox::new(Point::new(100.0, 80.0), Point::new(10.0, 20.0)),
        score: 0.85,
        user_data: vec![0xab],
    };
    let state = ProcessState {
        status: ProcessStatus::Running,
        progress: 45.5,
        current_item: "video1.mp4".to_string(),
        last_error: String::new(),
    };
    let matrix = Matrix::new(MatrixElem::F32, vec![2, 2], vec![0; 16]).unwrap();

    let mut builder = session.builder("intervals");
    builder.key_int("t1", 120, None).unwrap();
    builder.key_event("event", event.clone(), None).unwrap();
    builder.key_pstate("state", state.clone(), None).unwrap();
    builder.key_matrix("features", matrix.clone(), None).unwrap();
    let insert = builder.insert_query(None).unwrap();
    session.execute(&insert, builder.params()).await.unwrap();

    let mut query = session.builder("intervals");
    query.where_int("t1", 120, "=", None).unwrap();
    let mut rows = session.result_set();
    session
        .fetch(&query.select_query(), query.params(), &mut rows)
        .await
        .unwrap();
    assert!(rows.step());
    assert_eq!(rows.get_event_by_name("event").unwrap(), event);
    assert_eq!(rows.get_pstate_by_name("state").unwrap(), state);
    assert_eq!(rows.get_matrix_by_name("features").unwrap(), matrix);
    assert_eq!(
        rows.value_by_name("state").unwrap(),
        "(running,45.5,video1.mp4,)"
    );
}

#[tokio::test]
async fn transactions_and_last_insert_id() {
    let mut session = seeded_session().await;
    let builder = session.builder("sequences");

    session.execute(&builder.begin_query(), &[]).await.unwrap();
    session
        .execute(
            "INSERT INTO sequences (seqname) VALUES ($1);",
            &[Value::Text("cam03".to_string())],
        )
        .await
        .unwrap();
    session.execute(&builder.commit_query(), &[]).await.unwrap();

    let mut rows = session.result_set();
    session
        .fetch(&builder.last_inserted_id_query(), &[], &mut rows)
        .await
        .unwrap();
    assert!(rows.step());
    assert_eq!(rows.get_bigint(0).unwrap(), 1);

    session.execute(&builder.begin_query(), &[]).await.unwrap();
    session
        .execute(
            "INSERT INTO sequences (seqname) VALUES ($1);",
            &[Value::Text("cam04".to_string())],
        )
        .await
        .unwrap();
    session
        .execute(&builder.rollback_query(), &[])
        .await
        .unwrap();

    let count = session.builder("sequences");
    let mut rows = session.result_set();
    session
        .fetch(&count.count_query(), count.params(), &mut rows)
        .await
        .unwrap();
    assert!(rows.step());
    assert_eq!(rows.get_bigint_by_name("count").unwrap(), 1);
}

#[tokio::test]
async fn batch_statements_report_no_change_count() {
    let mut session = seeded_session().await;
    let changed = session
        .execute(
            "INSERT INTO sequences (seqname) VALUES ($1);",
            &[Value::Text("cam07".to_string())],
        )
        .await
        .unwrap();
    assert_eq!(changed, 1);

    // Transaction control runs as a batch script; no stale count leaks
    // through from the preceding insert.
    let builder = session.builder("sequences");
    let began = session.execute(&builder.begin_query(), &[]).await.unwrap();
    assert_eq!(began, 0);
    let committed = session.execute(&builder.commit_query(), &[]).await.unwrap();
    assert_eq!(committed, 0);
}

#[tokio::test]
async fn failed_fetch_clears_previous_rows() {
    let mut session = seeded_session().await;
    session
        .execute(
            "INSERT INTO sequences (seqname) VALUES ($1);",
            &[Value::Text("cam05".to_string())],
        )
        .await
        .unwrap();

    let mut rows = session.result_set();
    session
        .fetch("SELECT seqname FROM sequences;", &[], &mut rows)
        .await
        .unwrap();
    assert!(rows.is_ok());

    let err = session
        .fetch("SELECT nope FROM missing_table;", &[], &mut rows)
        .await;
    assert!(err.is_err());
    assert!(!rows.is_ok());
    assert!(matches!(
        rows.get_string(0),
        Err(VidmetaDbError::UninitializedResult)
    ));
}

#[tokio::test]
async fn type_mismatch_fails_loudly() {
    let mut session = seeded_session().await;
    session
        .execute(
            "INSERT INTO sequences (seqname, vid_frames) VALUES ($1, $2);",
            &[Value::Text("cam06".to_string()), Value::Int(42)],
        )
        .await
        .unwrap();

    let mut rows = session.result_set();
    session
        .fetch("SELECT seqname, vid_frames FROM sequences;", &[], &mut rows)
        .await
        .unwrap();
    assert!(rows.step());
    match rows.get_int_by_name("seqname") {
        Err(VidmetaDbError::TypeMismatch {
            column, requested, ..
        }) => {
            assert_eq!(column, "seqname");
            assert_eq!(requested, "int");
        }
        other => panic!("expected loud mismatch, got {other:?}"),
    }
    // The row stays readable through the right getter.
    assert_eq!(rows.get_int_by_name("vid_frames").unwrap(), 42);
}

#[tokio::test]
async fn disconnect_then_reconnect_restores_service() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("meta.db");
    let config = BackendConfig::new(Backend::Sqlite, path.to_str().unwrap(), "main");
    let mut session = DbSession::connect(config).await.unwrap();

    session
        .execute("CREATE TABLE t (x INTEGER);", &[])
        .await
        .unwrap();
    session
        .execute("INSERT INTO t (x) VALUES ($1);", &[Value::Int(7)])
        .await
        .unwrap();

    session.disconnect();
    assert!(!session.is_connected().await);
    let refused = session.execute("SELECT 1;", &[]).await;
    assert!(matches!(refused, Err(VidmetaDbError::ConnectionError(_))));

    session.reconnect().await.unwrap();
    assert!(session.is_connected().await);
    let mut rows = session.result_set();
    session
        .fetch("SELECT x FROM t;", &[], &mut rows)
        .await
        .unwrap();
    assert!(rows.step());
    assert_eq!(rows.get_int(0).unwrap(), 7);
}

#[tokio::test]
async fn schema_lifecycle_is_refused_on_embedded_backend() {
    let session = session().await;
    let builder = session.builder("sequences");
    assert!(matches!(
        builder.dataset_create_query("d", "/d", "D", ""),
        Err(VidmetaDbError::Unimplemented(_))
    ));
    assert!(matches!(
        builder.method_create_query("m", ""),
        Err(VidmetaDbError::Unimplemented(_))
    ));
}
