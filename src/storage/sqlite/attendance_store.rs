//! SQLite AttendanceStore implementation.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use sea_query::{Expr, OnConflict, Order, Query, SqliteQueryBuilder};
use sqlx::Row;

use super::rows::{self as decode, duplicate_as, DATE_FORMAT};
use super::SqliteStore;
use crate::model::{
    AttendanceEntry, AttendanceStatus, Event, Genre, ParticipationCounters,
    ParticipationHistoryRecord, PointBalance, PointLedgerRecord,
};
use crate::storage::schema::{
    AttendanceEntries, Events, ParticipationCounters as Counters, ParticipationHistory,
    PointBalances, PointLedger,
};
use crate::storage::{AttendanceStore, Result};

fn counter_column(genre: Genre) -> Counters {
    match genre {
        Genre::Official => Counters::OfficialCount,
        Genre::Unofficial => Counters::UnofficialCount,
    }
}

fn id_list(ids: &[i64]) -> String {
    ids.iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

impl SqliteStore {
    async fn max_id(&self, query: String) -> Result<Option<i64>> {
        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => Ok(row.try_get::<Option<i64>, _>(0)?),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl AttendanceStore for SqliteStore {
    async fn put_event(&self, event: &Event) -> Result<()> {
        let query = Query::insert()
            .into_table(Events::Table)
            .columns([Events::Id, Events::Title, Events::Genre, Events::StartAt])
            .values_panic([
                event.id.as_str().into(),
                event.title.as_str().into(),
                event.genre.as_flag().into(),
                event.start_at.as_str().into(),
            ])
            .on_conflict(
                OnConflict::column(Events::Id)
                    .update_columns([Events::Title, Events::Genre, Events::StartAt])
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn get_event(&self, event_id: &str) -> Result<Option<Event>> {
        let query = Query::select()
            .columns([Events::Id, Events::Title, Events::Genre, Events::StartAt])
            .from(Events::Table)
            .and_where(Expr::col(Events::Id).eq(event_id))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(decode::event).transpose()
    }

    async fn upsert_entry(
        &self,
        event_id: &str,
        employee_id: &str,
        status: AttendanceStatus,
    ) -> Result<()> {
        let query = Query::insert()
            .into_table(AttendanceEntries::Table)
            .columns([
                AttendanceEntries::EventId,
                AttendanceEntries::EmployeeId,
                AttendanceEntries::Status,
            ])
            .values_panic([event_id.into(), employee_id.into(), status.as_str().into()])
            .on_conflict(
                OnConflict::columns([AttendanceEntries::EventId, AttendanceEntries::EmployeeId])
                    .update_column(AttendanceEntries::Status)
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn get_entry(
        &self,
        event_id: &str,
        employee_id: &str,
    ) -> Result<Option<AttendanceEntry>> {
        let query = Query::select()
            .columns([
                AttendanceEntries::EventId,
                AttendanceEntries::EmployeeId,
                AttendanceEntries::Status,
            ])
            .from(AttendanceEntries::Table)
            .and_where(Expr::col(AttendanceEntries::EventId).eq(event_id))
            .and_where(Expr::col(AttendanceEntries::EmployeeId).eq(employee_id))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(decode::entry).transpose()
    }

    async fn list_entries(&self, event_id: &str) -> Result<Vec<AttendanceEntry>> {
        let query = Query::select()
            .columns([
                AttendanceEntries::EventId,
                AttendanceEntries::EmployeeId,
                AttendanceEntries::Status,
            ])
            .from(AttendanceEntries::Table)
            .and_where(Expr::col(AttendanceEntries::EventId).eq(event_id))
            .order_by(AttendanceEntries::EmployeeId, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(decode::entry).collect()
    }

    async fn provisional_attendees(&self, event_id: &str) -> Result<Vec<String>> {
        let query = Query::select()
            .column(AttendanceEntries::EmployeeId)
            .from(AttendanceEntries::Table)
            .and_where(Expr::col(AttendanceEntries::EventId).eq(event_id))
            .and_where(
                Expr::col(AttendanceEntries::Status)
                    .eq(AttendanceStatus::ProvisionalAttend.as_str()),
            )
            .order_by(AttendanceEntries::EmployeeId, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        let mut attendees = Vec::with_capacity(rows.len());
        for row in rows {
            attendees.push(row.try_get("employee_id")?);
        }
        Ok(attendees)
    }

    async fn set_status(
        &self,
        event_id: &str,
        employee_ids: &[String],
        status: AttendanceStatus,
    ) -> Result<u64> {
        if employee_ids.is_empty() {
            return Ok(0);
        }

        let query = Query::update()
            .table(AttendanceEntries::Table)
            .value(AttendanceEntries::Status, status.as_str())
            .and_where(Expr::col(AttendanceEntries::EventId).eq(event_id))
            .and_where(
                Expr::col(AttendanceEntries::EmployeeId)
                    .is_in(employee_ids.iter().map(String::as_str)),
            )
            .to_string(SqliteQueryBuilder);

        let result = sqlx::query(&query).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn max_history_id(&self) -> Result<Option<i64>> {
        let query = Query::select()
            .expr(Expr::col(ParticipationHistory::Id).max())
            .from(ParticipationHistory::Table)
            .to_string(SqliteQueryBuilder);
        self.max_id(query).await
    }

    async fn insert_history(&self, rows: &[ParticipationHistoryRecord]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let query = {
            let mut insert = Query::insert();
            insert.into_table(ParticipationHistory::Table).columns([
                ParticipationHistory::Id,
                ParticipationHistory::EmployeeId,
                ParticipationHistory::EventId,
                ParticipationHistory::ParticipationDate,
            ]);
            for row in rows {
                insert.values_panic([
                    row.id.into(),
                    row.employee_id.as_str().into(),
                    row.event_id.as_str().into(),
                    row.participation_date.format(DATE_FORMAT).to_string().into(),
                ]);
            }
            insert.to_string(SqliteQueryBuilder)
        };

        // A single multi-row INSERT is atomic in SQLite.
        sqlx::query(&query)
            .execute(&self.pool)
            .await
            .map_err(duplicate_as("participation_history", || {
                id_list(&rows.iter().map(|r| r.id).collect::<Vec<_>>())
            }))?;
        Ok(())
    }

    async fn delete_history(&self, ids: &[i64]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let query = Query::delete()
            .from_table(ParticipationHistory::Table)
            .and_where(Expr::col(ParticipationHistory::Id).is_in(ids.iter().copied()))
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn history_for_event(&self, event_id: &str) -> Result<Vec<ParticipationHistoryRecord>> {
        let query = Query::select()
            .columns([
                ParticipationHistory::Id,
                ParticipationHistory::EmployeeId,
                ParticipationHistory::EventId,
                ParticipationHistory::ParticipationDate,
            ])
            .from(ParticipationHistory::Table)
            .and_where(Expr::col(ParticipationHistory::EventId).eq(event_id))
            .order_by(ParticipationHistory::Id, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(decode::history).collect()
    }

    async fn max_ledger_id(&self) -> Result<Option<i64>> {
        let query = Query::select()
            .expr(Expr::col(PointLedger::Id).max())
            .from(PointLedger::Table)
            .to_string(SqliteQueryBuilder);
        self.max_id(query).await
    }

    async fn insert_ledger(&self, rows: &[PointLedgerRecord]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let query = {
            let mut insert = Query::insert();
            insert.into_table(PointLedger::Table).columns([
                PointLedger::Id,
                PointLedger::EmployeeId,
                PointLedger::Delta,
                PointLedger::Reason,
                PointLedger::EventId,
                PointLedger::ActorId,
                PointLedger::CreatedAt,
            ]);
            for row in rows {
                insert.values_panic([
                    row.id.into(),
                    row.employee_id.as_str().into(),
                    row.delta.into(),
                    row.reason.as_str().into(),
                    row.event_id.clone().into(),
                    row.actor_id.clone().into(),
                    row.created_at.to_rfc3339().into(),
                ]);
            }
            insert.to_string(SqliteQueryBuilder)
        };

        sqlx::query(&query)
            .execute(&self.pool)
            .await
            .map_err(duplicate_as("point_ledger", || {
                id_list(&rows.iter().map(|r| r.id).collect::<Vec<_>>())
            }))?;
        Ok(())
    }

    async fn delete_ledger(&self, ids: &[i64]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let query = Query::delete()
            .from_table(PointLedger::Table)
            .and_where(Expr::col(PointLedger::Id).is_in(ids.iter().copied()))
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn ledger_for_employee(&self, employee_id: &str) -> Result<Vec<PointLedgerRecord>> {
        let query = Query::select()
            .columns([
                PointLedger::Id,
                PointLedger::EmployeeId,
                PointLedger::Delta,
                PointLedger::Reason,
                PointLedger::EventId,
                PointLedger::ActorId,
                PointLedger::CreatedAt,
            ])
            .from(PointLedger::Table)
            .and_where(Expr::col(PointLedger::EmployeeId).eq(employee_id))
            .order_by(PointLedger::Id, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(decode::ledger).collect()
    }

    async fn participation_counters(
        &self,
        employee_id: &str,
    ) -> Result<Option<ParticipationCounters>> {
        let query = Query::select()
            .columns([
                Counters::EmployeeId,
                Counters::OfficialCount,
                Counters::UnofficialCount,
                Counters::LastUpdated,
            ])
            .from(Counters::Table)
            .and_where(Expr::col(Counters::EmployeeId).eq(employee_id))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(decode::counters).transpose()
    }

    async fn add_participation(
        &self,
        employee_id: &str,
        genre: Genre,
        delta: i64,
        at: DateTime<FixedOffset>,
    ) -> Result<ParticipationCounters> {
        let (official, unofficial) = match genre {
            Genre::Official => (delta, 0),
            Genre::Unofficial => (0, delta),
        };
        let updated_at = at.to_rfc3339();

        // INSERT .. ON CONFLICT DO UPDATE SET count = count + delta keeps the
        // increment a single statement.
        let query = Query::insert()
            .into_table(Counters::Table)
            .columns([
                Counters::EmployeeId,
                Counters::OfficialCount,
                Counters::UnofficialCount,
                Counters::LastUpdated,
            ])
            .values_panic([
                employee_id.into(),
                official.into(),
                unofficial.into(),
                updated_at.as_str().into(),
            ])
            .on_conflict(
                OnConflict::column(Counters::EmployeeId)
                    .value(
                        counter_column(genre),
                        Expr::col((Counters::Table, counter_column(genre))).add(delta),
                    )
                    .value(Counters::LastUpdated, updated_at.as_str())
                    .to_owned(),
            )
            .returning_all()
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_one(&self.pool).await?;
        decode::counters(&row)
    }

    async fn point_balance(&self, employee_id: &str) -> Result<Option<PointBalance>> {
        let query = Query::select()
            .columns([
                PointBalances::EmployeeId,
                PointBalances::TotalPoints,
                PointBalances::LastUpdated,
                PointBalances::LastUpdatedBy,
            ])
            .from(PointBalances::Table)
            .and_where(Expr::col(PointBalances::EmployeeId).eq(employee_id))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(decode::balance).transpose()
    }

    async fn add_points(
        &self,
        employee_id: &str,
        delta: i64,
        actor_id: Option<&str>,
        at: DateTime<FixedOffset>,
    ) -> Result<PointBalance> {
        let updated_at = at.to_rfc3339();
        let actor = actor_id.map(str::to_string);

        let query = Query::insert()
            .into_table(PointBalances::Table)
            .columns([
                PointBalances::EmployeeId,
                PointBalances::TotalPoints,
                PointBalances::LastUpdated,
                PointBalances::LastUpdatedBy,
            ])
            .values_panic([
                employee_id.into(),
                delta.into(),
                updated_at.as_str().into(),
                actor.clone().into(),
            ])
            .on_conflict(
                OnConflict::column(PointBalances::EmployeeId)
                    .value(
                        PointBalances::TotalPoints,
                        Expr::col((PointBalances::Table, PointBalances::TotalPoints)).add(delta),
                    )
                    .value(PointBalances::LastUpdated, updated_at.as_str())
                    .value(PointBalances::LastUpdatedBy, actor)
                    .to_owned(),
            )
            .returning_all()
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_one(&self.pool).await?;
        decode::balance(&row)
    }

    async fn try_debit_points(
        &self,
        employee_id: &str,
        amount: i64,
        actor_id: Option<&str>,
        at: DateTime<FixedOffset>,
    ) -> Result<Option<PointBalance>> {
        let query = Query::update()
            .table(PointBalances::Table)
            .value(
                PointBalances::TotalPoints,
                Expr::col(PointBalances::TotalPoints).sub(amount),
            )
            .value(PointBalances::LastUpdated, at.to_rfc3339())
            .value(PointBalances::LastUpdatedBy, actor_id.map(str::to_string))
            .and_where(Expr::col(PointBalances::EmployeeId).eq(employee_id))
            .and_where(Expr::col(PointBalances::TotalPoints).gte(amount))
            .returning_all()
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(decode::balance).transpose()
    }
}
