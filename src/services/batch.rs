//! Drive the customer pipeline over the whole spreadsheet, one customer at a time.

use crate::error::ClassifierError;
use crate::services::cancel::CancelToken;
use crate::services::pipeline::{CustomerPipeline, CustomerReport};
use crate::services::remote::ClassifierApi;
use crate::types::{group_by_customer, merge_rows, DocumentRow, Phase, ProcessingStatus, UploadedFile};
use std::sync::mpsc::Sender;
use std::time::Duration;

pub const CANCELLED_MESSAGE: &str = "Processing cancelled";

/// Receives every status transition and every merged row snapshot.
pub trait BatchObserver {
    fn on_status(&mut self, _status: &ProcessingStatus) {}
    fn on_rows(&mut self, _rows: &[DocumentRow]) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl BatchObserver for NoopObserver {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    Status(ProcessingStatus),
    Rows(Vec<DocumentRow>),
}

/// Forwards events over a channel; a dropped receiver is ignored.
pub struct ChannelObserver(pub Sender<BatchEvent>);

impl BatchObserver for ChannelObserver {
    fn on_status(&mut self, status: &ProcessingStatus) {
        let _ = self.0.send(BatchEvent::Status(status.clone()));
    }

    fn on_rows(&mut self, rows: &[DocumentRow]) {
        let _ = self.0.send(BatchEvent::Rows(rows.to_vec()));
    }
}

#[derive(Debug)]
pub struct BatchSummary {
    pub status: ProcessingStatus,
    pub reports: Vec<CustomerReport>,
    /// Set when the batch stopped early.
    pub error: Option<ClassifierError>,
}

pub struct BatchOrchestrator<C: ClassifierApi> {
    client: C,
    customer_delay: Duration,
    cancel: CancelToken,
    status: ProcessingStatus,
}

impl<C: ClassifierApi> BatchOrchestrator<C> {
    pub fn new(client: C, customer_delay: Duration, cancel: CancelToken) -> Self {
        Self {
            client,
            customer_delay,
            cancel,
            status: ProcessingStatus::default(),
        }
    }

    pub fn status(&self) -> &ProcessingStatus {
        &self.status
    }

    /// Back to idle, e.g. after a new upload.
    pub fn reset(&mut self, observer: &mut dyn BatchObserver) {
        self.status = ProcessingStatus::default();
        observer.on_status(&self.status);
    }

    fn publish(&self, observer: &mut dyn BatchObserver) {
        observer.on_status(&self.status);
    }

    /// Process every customer of `rows` in first-seen order. Each customer's rows are merged
    /// into `rows` as soon as that customer finishes; nothing is rolled back on failure.
    pub fn run(
        &mut self,
        rows: &mut Vec<DocumentRow>,
        files: &[UploadedFile],
        observer: &mut dyn BatchObserver,
    ) -> BatchSummary {
        let groups = group_by_customer(rows);
        let total = groups.len();
        self.status = ProcessingStatus {
            phase: Phase::Processing,
            total_customers: total,
            processed_customers: 0,
            current_customer: None,
            message: Some("Starting document processing...".into()),
        };
        self.publish(observer);
        tracing::info!("Starting batch: {} customer(s), {} file(s)", total, files.len());

        let mut reports = Vec::with_capacity(total);
        for (idx, group) in groups.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return self.stop(ClassifierError::Cancelled, reports, observer);
            }

            self.status.current_customer = Some(group.customer.clone());
            self.status.message = Some(format!("Processing customer: {}", group.customer));
            self.publish(observer);

            let pipeline = CustomerPipeline::new(&self.client, files, &self.cancel);
            let status = &mut self.status;
            let customer = group.customer.as_str();
            let result = pipeline.run(group, &mut |message: &str| {
                status.message = Some(format!("{}: {}", customer, message));
                observer.on_status(status);
            });

            let report = match result {
                Ok(report) => report,
                Err(e) => return self.stop(e, reports, observer),
            };

            merge_rows(rows, &report.rows);
            self.status.processed_customers = idx + 1;
            self.publish(observer);
            observer.on_rows(rows);
            tracing::info!("{} ({}/{})", report.summary(), idx + 1, total);
            reports.push(report);

            if idx + 1 < total && !self.cancel.sleep(self.customer_delay) {
                return self.stop(ClassifierError::Cancelled, reports, observer);
            }
        }

        self.status = ProcessingStatus {
            phase: Phase::Complete,
            total_customers: total,
            processed_customers: total,
            current_customer: None,
            message: Some("All customers processed successfully!".into()),
        };
        self.publish(observer);
        BatchSummary {
            status: self.status.clone(),
            reports,
            error: None,
        }
    }

    fn stop(
        &mut self,
        error: ClassifierError,
        reports: Vec<CustomerReport>,
        observer: &mut dyn BatchObserver,
    ) -> BatchSummary {
        let message = match &error {
            ClassifierError::Cancelled => CANCELLED_MESSAGE.to_string(),
            other => format!("An error occurred during processing: {}", other),
        };
        tracing::error!("Batch stopped after {} customer(s): {}", self.status.processed_customers, message);
        self.status.phase = Phase::Error;
        self.status.message = Some(message);
        self.publish(observer);
        BatchSummary {
            status: self.status.clone(),
            reports,
            error: Some(error),
        }
    }
}
