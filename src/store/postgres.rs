use async_trait::async_trait;
use error_stack::{Report, Result, ResultExt};

use super::{AttitudeStore, Followings, RelationStore, StoreError};
use crate::database::{self, ErrorExt, ErrorExt2};
use crate::types::article::Attitude;
use crate::types::{ArticleId, RelationPair, RelationState, StateFilter, UserId};

/// Postgres backed stores. Writes go to the primary pool, reads
/// prefer the replica.
#[derive(Debug, Clone)]
pub struct PgStore {
  primary: database::Pool,
  replica: Option<database::Pool>,
}

impl PgStore {
  #[must_use]
  pub fn new(primary: database::Pool, replica: Option<database::Pool>) -> Self {
    Self { primary, replica }
  }

  #[tracing::instrument(skip_all)]
  async fn db_write(&self) -> database::Result<database::PoolConnection> {
    self.primary.get_writable().await
  }

  #[tracing::instrument(skip_all)]
  async fn db_read(&self) -> database::Result<database::PoolConnection> {
    if let Some(replica) = self.replica.as_ref() {
      match replica.get().await {
        Ok(conn) => return Ok(conn),
        // fallback
        Err(err) if err.is_unhealthy() => {}
        Err(err) => return Err(err),
      }
    }
    self.primary.get().await
  }
}

fn into_store_error(report: Report<database::Error>) -> Report<StoreError> {
  if report.is_readonly() {
    report.change_context(StoreError::Readonly)
  } else {
    report.change_context(StoreError::Failed)
  }
}

#[async_trait]
impl RelationStore for PgStore {
  #[tracing::instrument(skip(self), name = "query.relations.insert_if_absent")]
  async fn insert_if_absent(
    &self,
    pair: RelationPair,
    state: RelationState,
  ) -> Result<bool, StoreError> {
    let mut conn = self.db_write().await.map_err(into_store_error)?;
    let result = sqlx::query(
      r#"INSERT INTO user_relation (user_id, target_user_id, relation)
      VALUES ($1, $2, $3)
      ON CONFLICT (user_id, target_user_id) DO NOTHING"#,
    )
    .bind(pair.actor)
    .bind(pair.target)
    .bind(state)
    .execute(&mut *conn)
    .await
    .into_db_error()
    .map_err(into_store_error)?;

    Ok(result.rows_affected() > 0)
  }

  #[tracing::instrument(skip(self), name = "query.relations.update_where")]
  async fn update_where(
    &self,
    pair: RelationPair,
    filter: StateFilter,
    state: RelationState,
  ) -> Result<u64, StoreError> {
    let (sql, expected) = match filter {
      StateFilter::Is(expected) => (
        r#"UPDATE user_relation
        SET relation = $3, updated_at = (now() AT TIME ZONE 'utc')
        WHERE user_id = $1 AND target_user_id = $2 AND relation = $4"#,
        expected,
      ),
      StateFilter::IsNot(excluded) => (
        r#"UPDATE user_relation
        SET relation = $3, updated_at = (now() AT TIME ZONE 'utc')
        WHERE user_id = $1 AND target_user_id = $2 AND relation <> $4"#,
        excluded,
      ),
    };

    let mut conn = self.db_write().await.map_err(into_store_error)?;
    let result = sqlx::query(sql)
      .bind(pair.actor)
      .bind(pair.target)
      .bind(state)
      .bind(expected)
      .execute(&mut *conn)
      .await
      .into_db_error()
      .map_err(into_store_error)?;

    Ok(result.rows_affected())
  }

  #[tracing::instrument(skip(self), name = "query.relations.state")]
  async fn state(&self, pair: RelationPair) -> Result<Option<RelationState>, StoreError> {
    let mut conn = self.db_read().await.map_err(into_store_error)?;
    sqlx::query_scalar::<_, RelationState>(
      r#"SELECT relation FROM user_relation WHERE user_id = $1 AND target_user_id = $2"#,
    )
    .bind(pair.actor)
    .bind(pair.target)
    .fetch_optional(&mut *conn)
    .await
    .into_db_error()
    .map_err(into_store_error)
  }

  #[tracing::instrument(skip(self), name = "query.relations.followings")]
  async fn followings(
    &self,
    actor: UserId,
    offset: u64,
    limit: u32,
  ) -> Result<Followings, StoreError> {
    let offset = i64::try_from(offset)
      .change_context(StoreError::Failed)
      .attach_printable("offset is too large")?;

    let mut conn = self.db_read().await.map_err(into_store_error)?;
    let total = sqlx::query_scalar::<_, i64>(
      r#"SELECT COUNT(*) FROM user_relation WHERE user_id = $1 AND relation = $2"#,
    )
    .bind(actor)
    .bind(RelationState::Follow)
    .fetch_one(&mut *conn)
    .await
    .into_db_error()
    .map_err(into_store_error)?;

    let targets = sqlx::query_scalar::<_, UserId>(
      r#"SELECT target_user_id FROM user_relation
      WHERE user_id = $1 AND relation = $2
      ORDER BY updated_at DESC, target_user_id DESC
      LIMIT $3 OFFSET $4"#,
    )
    .bind(actor)
    .bind(RelationState::Follow)
    .bind(i64::from(limit))
    .bind(offset)
    .fetch_all(&mut *conn)
    .await
    .into_db_error()
    .map_err(into_store_error)?;

    Ok(Followings {
      total: u64::try_from(total).unwrap_or_default(),
      targets,
    })
  }
}

#[async_trait]
impl AttitudeStore for PgStore {
  #[tracing::instrument(skip(self), name = "query.attitudes.find")]
  async fn attitude(
    &self,
    user: UserId,
    article: ArticleId,
  ) -> Result<Option<Attitude>, StoreError> {
    let mut conn = self.db_read().await.map_err(into_store_error)?;
    sqlx::query_scalar::<_, Attitude>(
      r#"SELECT attitude FROM news_attitude WHERE user_id = $1 AND article_id = $2"#,
    )
    .bind(user)
    .bind(article)
    .fetch_optional(&mut *conn)
    .await
    .into_db_error()
    .map_err(into_store_error)
  }
}
