//! End-to-end workflows against an embedded SQLite database.

use std::sync::Arc;

use tempfile::{tempdir, TempDir};

use energy_evidence::analysis::AnalysisRequest;
use energy_evidence::filter::{Facet, FilterEngine, FilterSet, SelectionController};
use energy_evidence::import::{ImportSessions, ImportState, SelectionUpdate};
use energy_evidence::models::{
    Actor, Moderator, NewRecord, NewUser, RecordStatus, Role, ALL_DECREASE, ALL_INCREASE,
};
use energy_evidence::repository::{DieselDbContext, RecordStore};
use energy_evidence::services::AnalysisService;

struct Fixture {
    ctx: DieselDbContext,
    store: Arc<dyn RecordStore>,
    _dir: TempDir,
}

async fn fixture() -> Fixture {
    let dir = tempdir().unwrap();
    let ctx = DieselDbContext::from_sqlite_path(&dir.path().join("evidence.db"));
    ctx.init_schema().await.unwrap();

    let rows = [
        ("EUI", "Increase", "Cfa", "Smith et al. 2019 reported higher EUI", None),
        ("EUI", "Decrease", "Cfb", "Jones 2020 found lower demand", Some(RecordStatus::Approved)),
        ("Cooling", "Increase", "BWh", "Lee 2021 hot desert study", None),
        ("Cooling", "Decrease", "Cfa", "Park 2018", Some(RecordStatus::Rejected)),
        ("EUI", "Increase", "Cfa", "0", None),
    ];
    let store: Arc<dyn RecordStore> = Arc::new(ctx.records());
    for (energy, direction, climate, paragraph, status) in rows {
        store
            .insert(&NewRecord {
                criteria: "Density".to_string(),
                energy_method: energy.to_string(),
                direction: direction.to_string(),
                paragraph: Some(paragraph.to_string()),
                climate: Some(climate.to_string()),
                status,
                ..Default::default()
            })
            .await
            .unwrap();
    }

    Fixture {
        ctx,
        store,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_facet_cascade_narrows_and_reconciles() {
    let fx = fixture().await;
    let engine = FilterEngine::new(fx.store.clone());

    let all = engine.query(&FilterSet::default()).await.unwrap();
    // The rejected record is hidden; the "0" paragraph is counted but not listed.
    assert_eq!(all.matched, 4);
    assert_eq!(
        all.results.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );

    let mut selection = SelectionController::default();
    selection.set(Facet::Climate, "Cfa");
    selection.set(Facet::EnergyMethod, "Cooling");
    let narrowed = engine.query(selection.filter()).await.unwrap();
    assert!(narrowed.results.is_empty());

    // Climate options ignore the climate selection itself.
    let climates: Vec<&str> = narrowed
        .options_for(Facet::Climate)
        .iter()
        .map(|o| o.value.as_str())
        .collect();
    assert_eq!(climates, vec!["BWh"]);

    let changed = selection.reconcile(&narrowed);
    assert_eq!(changed, vec![Facet::Climate]);
    assert!(selection.filter().climates.is_empty());

    let recovered = engine.query(selection.filter()).await.unwrap();
    assert_eq!(
        recovered.results.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![3]
    );
}

#[tokio::test]
async fn test_spreadsheet_import_updates_matched_records() {
    let fx = fixture().await;
    let sessions = ImportSessions::new(10);

    let csv = "Study Title,Location,Climate Zone,Building Type\n\
               Smith et al. 2019,Atlanta,Temperate | Cfa - Humid subtropical,Office\n\
               Nobody 1999,Nowhere,Tropical,Retail\n";
    let upload = sessions.upload(csv.as_bytes(), Some("studies.csv")).unwrap();
    assert_eq!(upload.title_column, "Study Title");
    assert!(upload.title_column_detected);
    assert_eq!(upload.rows, 2);

    let review = sessions
        .run_match(upload.session_id, fx.store.as_ref())
        .await
        .unwrap();
    assert_eq!(review.total_matches, 1);
    assert_eq!(review.unmatched, 1);
    assert_eq!(review.selected, 1);

    let outcome = sessions
        .confirm(upload.session_id, fx.store.as_ref(), |_| {})
        .await
        .unwrap();
    assert!(outcome.finished);
    assert_eq!(outcome.report.updated, vec![1]);
    assert_eq!(
        sessions.state(upload.session_id).unwrap(),
        ImportState::Idle
    );

    let record = fx.store.get(1).await.unwrap().unwrap();
    assert_eq!(record.location.as_deref(), Some("Atlanta"));
    assert_eq!(record.climate.as_deref(), Some("Cfa"));
    assert_eq!(record.building_use.as_deref(), Some("Office"));
    // Untouched by the sheet.
    assert_eq!(record.energy_method, "EUI");
}

#[tokio::test]
async fn test_deselected_import_is_rejected() {
    let fx = fixture().await;
    let sessions = ImportSessions::default();

    let csv = "Title,Location\nJones 2020,Leeds\n";
    let upload = sessions.upload(csv.as_bytes(), Some("one.csv")).unwrap();
    sessions
        .run_match(upload.session_id, fx.store.as_ref())
        .await
        .unwrap();
    sessions
        .update_selection(
            upload.session_id,
            &SelectionUpdate {
                clear: true,
                ..Default::default()
            },
        )
        .unwrap();

    assert!(sessions
        .confirm(upload.session_id, fx.store.as_ref(), |_| {})
        .await
        .is_err());
    assert_eq!(
        sessions.state(upload.session_id).unwrap(),
        ImportState::Reviewing
    );
    assert_eq!(fx.store.get(2).await.unwrap().unwrap().location, None);
}

#[tokio::test]
async fn test_saved_analysis_exports_svg() {
    let fx = fixture().await;
    let user = fx
        .ctx
        .users()
        .create(&NewUser {
            username: "ana".to_string(),
            email: None,
            role: Role::User,
            auth_id: None,
        })
        .await
        .unwrap();
    let actor = Actor::from_user(&user);

    let service = AnalysisService::new(fx.store.clone(), fx.ctx.analyses());
    let request = AnalysisRequest {
        determinant: "Density".to_string(),
        moderator: Moderator::Climate,
        top_energy: Some(ALL_INCREASE.to_string()),
        bottom_energy: Some(ALL_DECREASE.to_string()),
    };

    let saved = service.save(&actor, &request).await.unwrap();
    assert_eq!(service.list(&actor).await.unwrap().len(), 1);

    let svg = service.export_svg(&actor, saved.id).await.unwrap();
    assert!(svg.starts_with("<?xml"));
    assert!(svg.contains("Density"));
    assert!(svg.contains("Cfa"));

    // Someone else cannot see it.
    let other = Actor::Contributor {
        id: user.id + 1,
        username: "bo".to_string(),
    };
    assert!(service.export_svg(&other, saved.id).await.is_err());

    service.delete(&actor, saved.id).await.unwrap();
    assert!(service.list(&actor).await.unwrap().is_empty());
}
