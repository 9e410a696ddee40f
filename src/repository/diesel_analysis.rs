//! Saved analysis repository.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::diesel_models::{NewSavedAnalysisRow, SavedAnalysisRow};
use super::pool::DbPool;
use crate::error::{StoreError, StoreResult};
use crate::models::{NewSavedAnalysis, SavedAnalysis, NONE_ENERGY};
use crate::schema::user_saved_analyses;
use crate::with_conn;

#[derive(Clone)]
pub struct DieselAnalysisRepository {
    pool: DbPool,
}

fn energy_label(label: &str) -> Option<&str> {
    Some(if label.is_empty() { NONE_ENERGY } else { label })
}

fn to_json(tally: &[(String, i64)]) -> StoreResult<String> {
    serde_json::to_string(tally).map_err(|e| StoreError::Corrupt(e.to_string()))
}

impl DieselAnalysisRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, analysis: &NewSavedAnalysis) -> StoreResult<SavedAnalysis> {
        let model = &analysis.model;
        let created_at = chrono::Utc::now().to_rfc3339();
        let row = NewSavedAnalysisRow {
            user_id: analysis.user_id,
            analysis_type: model.moderator.as_str(),
            determinant: &model.determinant,
            top_energy: energy_label(&model.top_energy),
            bottom_energy: energy_label(&model.bottom_energy),
            top_sorted: Some(to_json(&model.top_sorted)?),
            bottom_sorted: Some(to_json(&model.bottom_sorted)?),
            top_height: Some(model.top_height),
            bottom_height: Some(model.bottom_height),
            html: Some(&analysis.html),
            created_at: &created_at,
        };

        let saved: SavedAnalysisRow = with_conn!(self.pool, conn => {
            diesel::insert_into(user_saved_analyses::table)
                .values(&row)
                .returning(SavedAnalysisRow::as_returning())
                .get_result(&mut conn)
                .await
        })?;
        Ok(saved.into_saved())
    }

    /// A user's analyses, newest first.
    pub async fn list_for_user(&self, user_id: i64) -> StoreResult<Vec<SavedAnalysis>> {
        let rows: Vec<SavedAnalysisRow> = with_conn!(self.pool, conn => {
            user_saved_analyses::table
                .filter(user_saved_analyses::user_id.eq(user_id))
                .order(user_saved_analyses::id.desc())
                .select(SavedAnalysisRow::as_select())
                .load(&mut conn)
                .await
        })?;
        Ok(rows.into_iter().map(SavedAnalysisRow::into_saved).collect())
    }

    pub async fn get(&self, id: i64) -> StoreResult<Option<SavedAnalysis>> {
        let row: Option<SavedAnalysisRow> = with_conn!(self.pool, conn => {
            user_saved_analyses::table
                .find(id)
                .select(SavedAnalysisRow::as_select())
                .first(&mut conn)
                .await
                .optional()
        })?;
        Ok(row.map(SavedAnalysisRow::into_saved))
    }

    /// Delete an analysis only if `user_id` owns it. Returns whether a row went.
    pub async fn delete_owned(&self, id: i64, user_id: i64) -> StoreResult<bool> {
        let deleted: usize = with_conn!(self.pool, conn => {
            diesel::delete(
                user_saved_analyses::table
                    .filter(user_saved_analyses::id.eq(id))
                    .filter(user_saved_analyses::user_id.eq(user_id)),
            )
            .execute(&mut conn)
            .await
        })?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisModel, Moderator, NewUser, Role};
    use crate::repository::diesel_user::DieselUserRepository;
    use crate::repository::migrations::run_migrations;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_insert_list_and_delete_owned() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("evidence.db");
        run_migrations(&path.display().to_string(), false)
            .await
            .unwrap();
        let pool = DbPool::sqlite_from_path(&path);
        let users = DieselUserRepository::new(pool.clone());
        let owner = users
            .create(&NewUser {
                username: "owner".to_string(),
                email: None,
                role: Role::User,
                auth_id: None,
            })
            .await
            .unwrap();

        let repo = DieselAnalysisRepository::new(pool);
        let model = AnalysisModel {
            determinant: "Compactness".to_string(),
            moderator: Moderator::Climate,
            top_energy: "EUI".to_string(),
            bottom_energy: NONE_ENERGY.to_string(),
            top_sorted: vec![("Cfa".to_string(), 3), ("Cwa".to_string(), 1)],
            bottom_sorted: vec![],
            top_height: 4,
            bottom_height: 0,
        };
        let saved = repo
            .insert(&NewSavedAnalysis {
                user_id: owner.id,
                model: model.clone(),
                html: "<div class=\"analysis\"></div>".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(saved.analysis_type, "Climate");
        assert_eq!(saved.model().unwrap(), model);
        assert_eq!(repo.list_for_user(owner.id).await.unwrap().len(), 1);

        assert!(!repo.delete_owned(saved.id, owner.id + 1).await.unwrap());
        assert!(repo.delete_owned(saved.id, owner.id).await.unwrap());
        assert!(repo.get(saved.id).await.unwrap().is_none());
    }
}
