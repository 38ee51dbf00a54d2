mod common;
use common::{standard_recording, with_constant_channel, without_channel};
use epochrank::{
    run_pipeline, run_pipeline_with, select_best, AlphaGrade, PipelineConfig, QualityError,
    RankingCache, ReferenceId,
};

#[test]
fn sixty_seconds_gives_51_epochs() {
    let rec = standard_recording(60);
    let table = run_pipeline(&rec, ReferenceId::LinkedEars, 10.0).unwrap();
    assert_eq!(table.len(), 51);
    assert_eq!(table.reference, ReferenceId::LinkedEars);

    let mut indices: Vec<usize> = table.rows.iter().map(|r| r.index).collect();
    indices.sort_unstable();
    assert_eq!(indices, (0..51).collect::<Vec<_>>());
    for row in &table.rows {
        approx::assert_abs_diff_eq!(row.start_sec, row.index as f32, epsilon = 1e-6);
    }
}

#[test]
fn clean_recording_has_no_bad_leads() {
    let table = run_pipeline(&standard_recording(30), ReferenceId::LinkedEars, 10.0).unwrap();
    for row in &table.rows {
        assert!(row.bad_leads.is_empty(), "epoch {}: {:?}", row.index, row.bad_leads);
        assert_eq!(row.bad_grade, 1);
        assert!(row.sync_score > 0.0);
        assert!(row.alpha_power > 0.0);
    }
}

#[test]
fn constant_channel_is_bad_and_excluded() {
    let rec = with_constant_channel(60, "Cz", 25.0);
    let table = run_pipeline(&rec, ReferenceId::LinkedEars, 10.0).unwrap();
    assert_eq!(table.len(), 51);

    let reference = run_pipeline(&without_channel(&rec, "Cz"), ReferenceId::LinkedEars, 10.0).unwrap();
    for row in &table.rows {
        assert!(row.bad_leads.contains("Cz"), "epoch {}: {:?}", row.index, row.bad_leads);
        assert_eq!(row.n_bad, 1);
        assert_eq!(row.bad_grade, 2);

        let clean = reference.by_index(row.index).unwrap();
        approx::assert_relative_eq!(row.alpha_power, clean.alpha_power, max_relative = 1e-9);
        approx::assert_relative_eq!(row.sync_score, clean.sync_score, max_relative = 1e-9);
    }
}

#[test]
fn runs_are_deterministic() {
    let rec = standard_recording(25);
    let a = run_pipeline(&rec, ReferenceId::Centroid, 8.0).unwrap();
    let b = run_pipeline(&rec, ReferenceId::Centroid, 8.0).unwrap();
    assert_eq!(a, b);
}

#[test]
fn rows_follow_ranking_order() {
    let rec = with_constant_channel(40, "O1", 0.0);
    let table = run_pipeline(&rec, ReferenceId::LinkedEars, 5.0).unwrap();
    for pair in table.rows.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(a.bad_grade <= b.bad_grade);
        if a.bad_grade == b.bad_grade {
            assert!(a.alpha_power >= b.alpha_power);
            if a.alpha_power == b.alpha_power {
                assert!(a.index < b.index);
            }
        }
    }
}

#[test]
fn alpha_grades_are_batch_percentiles() {
    let table = run_pipeline(&standard_recording(60), ReferenceId::LinkedEars, 10.0).unwrap();
    let worst_a = table
        .rows
        .iter()
        .filter(|r| r.alpha_grade == AlphaGrade::A)
        .map(|r| r.alpha_power)
        .fold(f64::INFINITY, f64::min);
    let best_f = table
        .rows
        .iter()
        .filter(|r| r.alpha_grade == AlphaGrade::F)
        .map(|r| r.alpha_power)
        .fold(f64::NEG_INFINITY, f64::max);
    assert!(worst_a.is_finite() && best_f.is_finite());
    assert!(worst_a > best_f);
}

#[test]
fn every_reference_runs() {
    let rec = standard_recording(20);
    for id in ReferenceId::ALL {
        let table = run_pipeline(&rec, id, 10.0).unwrap();
        assert_eq!(table.len(), 11, "{id}");
    }
}

#[test]
fn channel_order_does_not_change_synchrony() {
    let rec = standard_recording(20);
    let n = rec.n_channels();
    let order: Vec<usize> = (0..n).rev().collect();
    let data = rec.data().select(ndarray::Axis(0), &order);
    let labels = order.iter().map(|&i| rec.labels()[i].clone()).collect();
    let reversed = epochrank::Recording::new(data, labels, rec.sfreq()).unwrap();

    let a = run_pipeline(&rec, ReferenceId::LinkedEars, 10.0).unwrap();
    let b = run_pipeline(&reversed, ReferenceId::LinkedEars, 10.0).unwrap();
    for row in &a.rows {
        let other = b.by_index(row.index).unwrap();
        assert_eq!(row.sync_score, other.sync_score);
        approx::assert_relative_eq!(row.alpha_power, other.alpha_power, max_relative = 1e-12);
    }
}

#[test]
fn invalid_duration_and_reference_rejected() {
    let rec = standard_recording(10);
    for d in [2.0, 31.0, f32::NAN] {
        assert!(matches!(
            run_pipeline(&rec, ReferenceId::Centroid, d),
            Err(QualityError::Configuration(_))
        ));
    }
    assert!(matches!("surface-laplacian".parse::<ReferenceId>(), Err(QualityError::Configuration(_))));
}

#[test]
fn linked_ears_without_ears_fails() {
    let rec = without_channel(&standard_recording(10), "A2");
    let err = run_pipeline(&rec, ReferenceId::LinkedEars, 5.0).unwrap_err();
    assert!(matches!(err, QualityError::MissingChannels { .. }));
}

#[test]
fn select_best_respects_limit() {
    let rec = standard_recording(30);
    let table = run_pipeline(&rec, ReferenceId::LinkedEars, 10.0).unwrap();
    let limit = table.rows.iter().map(|r| r.sync_score).fold(0.0, f64::max);
    let best = select_best(&table, limit, 5);
    assert_eq!(best.len(), 5);
    assert!(best.iter().all(|r| r.sync_score < limit));
    assert!(select_best(&table, 0.0, 20).is_empty());
}

#[test]
fn resampled_input_matches_native_epoch_count() {
    let rec = standard_recording(30);
    let data = epochrank::resample::resample(rec.data(), 256.0, 512.0).unwrap();
    let upsampled = epochrank::Recording::new(data, rec.labels().to_vec(), 512.0).unwrap();
    let cfg = PipelineConfig { epoch_dur: 10.0, parallel: false, ..PipelineConfig::default() };
    let table = run_pipeline_with(&upsampled, ReferenceId::LinkedEars, &cfg).unwrap();
    assert_eq!(table.len(), 21);
}

#[test]
fn cache_matches_direct_run() {
    let rec = standard_recording(20);
    let mut cache = RankingCache::new(&rec, PipelineConfig::default());
    let cached = cache.get_or_run(ReferenceId::LinkedEars, 10.0).unwrap().clone();
    let direct = run_pipeline(&rec, ReferenceId::LinkedEars, 10.0).unwrap();
    assert_eq!(cached, direct);
    assert_eq!(cache.len(), 1);
}
