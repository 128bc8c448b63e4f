//! Fee Ledger - schedule creation, payments and paid totals
//!
//! Line items are created once per student from the resolved template;
//! payments are append-only and only COMPLETED ones count toward paid
//! totals. The paid ratio feeds the registration eligibility gate.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::engine::AcademicEngine;
use crate::error::{EngineError, EngineResult, StoreError};
use crate::models::{FeeComponent, FeeLineItem, Payment, PaymentStatus};
use crate::store::{NewFeeLineItem, NewPayment};

/// One ledger line in a student statement.
#[derive(Debug, Clone, Serialize)]
pub struct FeeStatementLine {
    pub description: String,
    pub billed: Decimal,
    pub paid: Decimal,
    pub outstanding: Decimal,
    pub is_paid: bool,
}

/// Billed/paid/outstanding totals for one student.
#[derive(Debug, Clone, Serialize)]
pub struct FeeStatement {
    pub student_id: Uuid,
    pub lines: Vec<FeeStatementLine>,
    pub total_billed: Decimal,
    pub total_paid: Decimal,
    pub total_outstanding: Decimal,
}

impl AcademicEngine {
    /// Create the full fee schedule for a student from their programme's
    /// template. Refused with `FeesAlreadyExist` when any line item is
    /// already on the ledger, so admission-approval retries cannot bill
    /// twice.
    pub async fn create_schedule_fees(
        &self,
        student_id: Uuid,
        programme_name: &str,
    ) -> EngineResult<Vec<FeeLineItem>> {
        let template = self.fee_book().resolve(programme_name).ok_or_else(|| {
            EngineError::NoFeeStructure {
                programme: programme_name.to_string(),
            }
        })?;

        let now = Utc::now();
        let items: Vec<NewFeeLineItem> = template
            .components()
            .into_iter()
            .map(|(component, amount)| NewFeeLineItem {
                student_id,
                amount,
                description: component.description().to_string(),
                due_date: now + Duration::days(component.due_offset_days()),
            })
            .collect();

        match self.store().create_fee_schedule(student_id, items).await {
            Ok(created) => {
                info!(
                    "Created {} fee line items for student {} ({})",
                    created.len(),
                    student_id,
                    template.programme
                );
                Ok(created)
            }
            Err(StoreError::Conflict(_)) => Err(EngineError::FeesAlreadyExist { student_id }),
            Err(err) => Err(err.into()),
        }
    }

    /// Append a payment against one of the student's line items.
    pub async fn record_payment(
        &self,
        student_id: Uuid,
        fee_line_item_id: Uuid,
        amount: Decimal,
        status: PaymentStatus,
    ) -> EngineResult<Payment> {
        let item = self
            .store()
            .fee_line_item(fee_line_item_id)
            .await?
            .filter(|item| item.student_id == student_id)
            .ok_or(EngineError::RecordNotFound {
                entity: "fee line item",
            })?;

        let payment = self
            .store()
            .insert_payment(NewPayment {
                student_id,
                fee_line_item_id: item.id,
                amount,
                status,
            })
            .await?;

        info!(
            "Recorded {:?} payment of {} against '{}' for student {}",
            payment.status, payment.amount, item.description, student_id
        );
        Ok(payment)
    }

    /// Paid/total ratio in [0, 1] over the student's line items, optionally
    /// restricted to one component. 0 when nothing is billed.
    pub async fn paid_ratio(
        &self,
        student_id: Uuid,
        component: Option<FeeComponent>,
    ) -> EngineResult<f64> {
        let (paid, total) = self.component_totals(student_id, component).await?;
        if total.is_zero() {
            return Ok(0.0);
        }
        Ok((paid / total).to_f64().unwrap_or(0.0).min(1.0))
    }

    /// Billed and COMPLETED-paid sums over the student's line items,
    /// optionally restricted to one component.
    pub(crate) async fn component_totals(
        &self,
        student_id: Uuid,
        component: Option<FeeComponent>,
    ) -> EngineResult<(Decimal, Decimal)> {
        let items = self.store().fee_line_items(student_id).await?;
        let selected: Vec<&FeeLineItem> = items
            .iter()
            .filter(|item| {
                component.is_none_or(|c| item.description == c.description())
            })
            .collect();

        let total: Decimal = selected.iter().map(|item| item.amount).sum();
        if total.is_zero() {
            return Ok((Decimal::ZERO, total));
        }

        let ids: HashSet<Uuid> = selected.iter().map(|item| item.id).collect();
        let paid: Decimal = self
            .store()
            .payments_for_student(student_id)
            .await?
            .iter()
            .filter(|p| p.status == PaymentStatus::Completed && ids.contains(&p.fee_line_item_id))
            .map(|p| p.amount)
            .sum();

        Ok((paid, total))
    }

    /// Per-line and overall billed/paid/outstanding summary.
    pub async fn fee_statement(&self, student_id: Uuid) -> EngineResult<FeeStatement> {
        let items = self.store().fee_line_items(student_id).await?;
        let payments = self.store().payments_for_student(student_id).await?;

        let mut lines = Vec::with_capacity(items.len());
        let mut total_billed = Decimal::ZERO;
        let mut total_paid = Decimal::ZERO;

        for item in &items {
            let paid: Decimal = payments
                .iter()
                .filter(|p| p.status == PaymentStatus::Completed && p.fee_line_item_id == item.id)
                .map(|p| p.amount)
                .sum();
            let outstanding = (item.amount - paid).max(Decimal::ZERO);

            total_billed += item.amount;
            total_paid += paid;
            lines.push(FeeStatementLine {
                description: item.description.clone(),
                billed: item.amount,
                paid,
                outstanding,
                is_paid: item.is_paid,
            });
        }

        Ok(FeeStatement {
            student_id,
            total_outstanding: (total_billed - total_paid).max(Decimal::ZERO),
            total_billed,
            total_paid,
            lines,
        })
    }
}
