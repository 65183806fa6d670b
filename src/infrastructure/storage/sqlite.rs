use crate::core::errors::FundError;
use crate::core::models::{
    BillSharing, BillSharingDetail, BillSharingExpense, BillSharingParticipant, Employee, Expense, FundPayment,
    PaymentStatus, SharingState, SharingStatus,
};
use crate::infrastructure::storage::{CHANGE_CHANNEL_CAPACITY, LedgerChange, LedgerStore};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::task;
use tracing::{debug, info, warn};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS employees (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    department TEXT,
    participates_in_fund INTEGER NOT NULL,
    status TEXT NOT NULL,
    join_date TEXT,
    leave_date TEXT,
    monthly_contribution TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS expenses (
    id TEXT PRIMARY KEY,
    amount TEXT NOT NULL,
    expense_date TEXT NOT NULL,
    description TEXT NOT NULL,
    category TEXT NOT NULL,
    notes TEXT,
    amount_reimbursed TEXT NOT NULL DEFAULT '0',
    sharing_status TEXT NOT NULL DEFAULT 'not_shared'
);
CREATE TABLE IF NOT EXISTS fund_payments (
    id TEXT PRIMARY KEY,
    employee_id TEXT NOT NULL REFERENCES employees(id),
    amount TEXT NOT NULL,
    payment_date TEXT NOT NULL,
    months_covered TEXT NOT NULL,
    payment_method TEXT NOT NULL,
    notes TEXT
);
CREATE TABLE IF NOT EXISTS bill_sharing (
    id TEXT PRIMARY KEY,
    total_amount TEXT NOT NULL,
    sharing_date TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS bill_sharing_expenses (
    id TEXT PRIMARY KEY,
    bill_sharing_id TEXT NOT NULL REFERENCES bill_sharing(id),
    expense_id TEXT NOT NULL REFERENCES expenses(id),
    amount TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS bill_sharing_participants (
    id TEXT PRIMARY KEY,
    bill_sharing_id TEXT NOT NULL REFERENCES bill_sharing(id),
    employee_id TEXT NOT NULL REFERENCES employees(id),
    amount_owed TEXT NOT NULL,
    is_birthday_person INTEGER NOT NULL,
    payment_method TEXT NOT NULL,
    payment_status TEXT NOT NULL,
    payment_date TEXT
);
CREATE INDEX IF NOT EXISTS idx_bse_sharing ON bill_sharing_expenses(bill_sharing_id);
CREATE INDEX IF NOT EXISTS idx_bse_expense ON bill_sharing_expenses(expense_id);
CREATE INDEX IF NOT EXISTS idx_bsp_sharing ON bill_sharing_participants(bill_sharing_id);
";

const EMPLOYEE_COLUMNS: &str =
    "id, name, department, participates_in_fund, status, join_date, leave_date, monthly_contribution";
const EXPENSE_COLUMNS: &str =
    "id, amount, expense_date, description, category, notes, amount_reimbursed, sharing_status";
const PARTICIPANT_COLUMNS: &str = "id, bill_sharing_id, employee_id, amount_owed, is_birthday_person, \
     payment_method, payment_status, payment_date";

/// Ledger persisted in a SQLite database. Multi-table operations run inside
/// one SQL transaction. rusqlite is synchronous, so every call runs on the
/// blocking pool while holding the connection lock.
#[derive(Clone)]
pub struct SqliteLedger {
    conn: Arc<Mutex<Connection>>,
    changes: broadcast::Sender<LedgerChange>,
}

impl SqliteLedger {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FundError> {
        info!("Opening SQLite ledger at {}", path.as_ref().display());
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, FundError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, FundError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(SqliteLedger {
            conn: Arc::new(Mutex::new(conn)),
            changes,
        })
    }

    fn notify(&self, change: LedgerChange) {
        let _ = self.changes.send(change);
    }

    async fn run<T, F>(&self, work: F) -> Result<T, FundError>
    where
        F: FnOnce(&mut Connection) -> Result<T, FundError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| FundError::DatabaseError("SQLite connection lock poisoned".to_string()))?;
            work(&mut conn)
        })
        .await
        .map_err(|e| FundError::DatabaseError(format!("SQLite task failed: {}", e)))?
    }
}

fn parsed<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.to_string().into()))
}

fn parsed_opt<T>(row: &Row, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|r| {
        r.parse::<T>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.to_string().into()))
    })
    .transpose()
}

fn timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn employee_from_row(row: &Row) -> rusqlite::Result<Employee> {
    Ok(Employee {
        id: row.get(0)?,
        name: row.get(1)?,
        department: row.get(2)?,
        participates_in_fund: row.get(3)?,
        status: parsed(row, 4)?,
        join_date: parsed_opt(row, 5)?,
        leave_date: parsed_opt(row, 6)?,
        monthly_contribution: parsed(row, 7)?,
    })
}

fn expense_from_row(row: &Row) -> rusqlite::Result<Expense> {
    Ok(Expense {
        id: row.get(0)?,
        amount: parsed(row, 1)?,
        expense_date: parsed(row, 2)?,
        description: row.get(3)?,
        category: parsed(row, 4)?,
        notes: row.get(5)?,
        amount_reimbursed: parsed(row, 6)?,
        sharing_status: parsed(row, 7)?,
    })
}

fn fund_payment_from_row(row: &Row) -> rusqlite::Result<FundPayment> {
    let months: String = row.get(4)?;
    Ok(FundPayment {
        id: row.get(0)?,
        employee_id: row.get(1)?,
        amount: parsed(row, 2)?,
        payment_date: parsed(row, 3)?,
        months_covered: serde_json::from_str(&months)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
        payment_method: parsed(row, 5)?,
        notes: row.get(6)?,
    })
}

fn sharing_from_row(row: &Row) -> rusqlite::Result<BillSharing> {
    Ok(BillSharing {
        id: row.get(0)?,
        total_amount: parsed(row, 1)?,
        sharing_date: parsed(row, 2)?,
        status: parsed(row, 3)?,
        created_at: parsed(row, 4)?,
    })
}

fn participant_from_row(row: &Row) -> rusqlite::Result<BillSharingParticipant> {
    Ok(BillSharingParticipant {
        id: row.get(0)?,
        bill_sharing_id: row.get(1)?,
        employee_id: row.get(2)?,
        amount_owed: parsed(row, 3)?,
        is_birthday_person: row.get(4)?,
        payment_method: parsed(row, 5)?,
        payment_status: parsed(row, 6)?,
        payment_date: parsed_opt(row, 7)?,
    })
}

fn link_from_row(row: &Row) -> rusqlite::Result<BillSharingExpense> {
    Ok(BillSharingExpense {
        id: row.get(0)?,
        bill_sharing_id: row.get(1)?,
        expense_id: row.get(2)?,
        amount: parsed(row, 3)?,
    })
}

fn load_expense(conn: &Connection, expense_id: &str) -> Result<Option<Expense>, FundError> {
    let sql = format!("SELECT {} FROM expenses WHERE id = ?1", EXPENSE_COLUMNS);
    Ok(conn.query_row(&sql, params![expense_id], expense_from_row).optional()?)
}

fn store_reimbursement(conn: &Connection, expense: &Expense) -> Result<(), FundError> {
    conn.execute(
        "UPDATE expenses SET amount_reimbursed = ?1, sharing_status = ?2 WHERE id = ?3",
        params![
            expense.amount_reimbursed.to_string(),
            expense.sharing_status.as_str(),
            expense.id
        ],
    )?;
    Ok(())
}

fn is_linked(conn: &Connection, expense_id: &str) -> Result<bool, FundError> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM bill_sharing_expenses WHERE expense_id = ?1)",
        params![expense_id],
        |row| row.get(0),
    )?)
}

fn sharing_state(conn: &Connection, sharing_id: &str) -> Result<SharingState, FundError> {
    let status: Option<SharingState> = conn
        .query_row(
            "SELECT id, total_amount, sharing_date, status, created_at FROM bill_sharing WHERE id = ?1",
            params![sharing_id],
            sharing_from_row,
        )
        .optional()?
        .map(|s| s.status);
    status.ok_or_else(|| FundError::BillSharingNotFound(sharing_id.to_string()))
}

fn load_links(conn: &Connection, sharing_id: &str) -> Result<Vec<BillSharingExpense>, FundError> {
    let mut stmt = conn.prepare(
        "SELECT id, bill_sharing_id, expense_id, amount FROM bill_sharing_expenses \
         WHERE bill_sharing_id = ?1 ORDER BY rowid",
    )?;
    let links = stmt
        .query_map(params![sharing_id], link_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(links)
}

fn load_detail(conn: &Connection, sharing: BillSharing) -> Result<BillSharingDetail, FundError> {
    let sql = format!(
        "SELECT {} FROM bill_sharing_participants WHERE bill_sharing_id = ?1 ORDER BY employee_id",
        PARTICIPANT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let participants = stmt
        .query_map(params![sharing.id], participant_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    let expenses = load_links(conn, &sharing.id)?;
    Ok(BillSharingDetail {
        sharing,
        participants,
        expenses,
    })
}

fn delete_sharing_rows(conn: &Connection, sharing_id: &str) -> Result<(), FundError> {
    conn.execute(
        "DELETE FROM bill_sharing_participants WHERE bill_sharing_id = ?1",
        params![sharing_id],
    )?;
    conn.execute(
        "DELETE FROM bill_sharing_expenses WHERE bill_sharing_id = ?1",
        params![sharing_id],
    )?;
    conn.execute("DELETE FROM bill_sharing WHERE id = ?1", params![sharing_id])?;
    Ok(())
}

fn insert_employee_row(conn: &Connection, employee: &Employee) -> Result<(), FundError> {
    conn.execute(
        "INSERT INTO employees (id, name, department, participates_in_fund, status, join_date, leave_date, \
         monthly_contribution) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            employee.id,
            employee.name,
            employee.department,
            employee.participates_in_fund,
            employee.status.as_str(),
            employee.join_date.map(|d| d.to_string()),
            employee.leave_date.map(|d| d.to_string()),
            employee.monthly_contribution.to_string(),
        ],
    )?;
    Ok(())
}

#[async_trait]
impl LedgerStore for SqliteLedger {
    async fn list_employees(&self) -> Result<Vec<Employee>, FundError> {
        self.run(|conn| {
            let sql = format!("SELECT {} FROM employees ORDER BY name", EMPLOYEE_COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let employees = stmt
                .query_map([], employee_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(employees)
        })
        .await
    }

    async fn get_employee(&self, employee_id: &str) -> Result<Option<Employee>, FundError> {
        let employee_id = employee_id.to_string();
        self.run(move |conn| {
            let sql = format!("SELECT {} FROM employees WHERE id = ?1", EMPLOYEE_COLUMNS);
            Ok(conn.query_row(&sql, params![employee_id], employee_from_row).optional()?)
        })
        .await
    }

    async fn insert_employee(&self, employee: Employee) -> Result<(), FundError> {
        self.run(move |conn| insert_employee_row(conn, &employee)).await?;
        self.notify(LedgerChange::Employees);
        Ok(())
    }

    async fn update_employee(&self, employee: Employee) -> Result<(), FundError> {
        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE employees SET name = ?1, department = ?2, participates_in_fund = ?3, status = ?4, \
                 join_date = ?5, leave_date = ?6, monthly_contribution = ?7 WHERE id = ?8",
                params![
                    employee.name,
                    employee.department,
                    employee.participates_in_fund,
                    employee.status.as_str(),
                    employee.join_date.map(|d| d.to_string()),
                    employee.leave_date.map(|d| d.to_string()),
                    employee.monthly_contribution.to_string(),
                    employee.id,
                ],
            )?;
            if changed == 0 {
                return Err(FundError::EmployeeNotFound(employee.id));
            }
            Ok(())
        })
        .await?;
        self.notify(LedgerChange::Employees);
        Ok(())
    }

    async fn delete_employee(&self, employee_id: &str) -> Result<(), FundError> {
        let employee_id = employee_id.to_string();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            let known: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM employees WHERE id = ?1)",
                params![employee_id],
                |row| row.get(0),
            )?;
            if !known {
                return Err(FundError::EmployeeNotFound(employee_id));
            }
            let referenced: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM fund_payments WHERE employee_id = ?1) \
                 OR EXISTS(SELECT 1 FROM bill_sharing_participants WHERE employee_id = ?1)",
                params![employee_id],
                |row| row.get(0),
            )?;
            if referenced {
                return Err(FundError::EmployeeInUse(employee_id));
            }
            tx.execute("DELETE FROM employees WHERE id = ?1", params![employee_id])?;
            tx.commit()?;
            Ok(())
        })
        .await?;
        self.notify(LedgerChange::Employees);
        Ok(())
    }

    async fn list_expenses(&self) -> Result<Vec<Expense>, FundError> {
        self.run(|conn| {
            let sql = format!(
                "SELECT {} FROM expenses ORDER BY expense_date DESC, id",
                EXPENSE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let expenses = stmt
                .query_map([], expense_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(expenses)
        })
        .await
    }

    async fn get_expense(&self, expense_id: &str) -> Result<Option<Expense>, FundError> {
        let expense_id = expense_id.to_string();
        self.run(move |conn| load_expense(conn, &expense_id)).await
    }

    async fn insert_expense(&self, expense: Expense) -> Result<(), FundError> {
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO expenses (id, amount, expense_date, description, category, notes, amount_reimbursed, \
                 sharing_status) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    expense.id,
                    expense.amount.to_string(),
                    expense.expense_date.to_string(),
                    expense.description,
                    expense.category.as_str(),
                    expense.notes,
                    expense.amount_reimbursed.to_string(),
                    expense.sharing_status.as_str(),
                ],
            )?;
            Ok(())
        })
        .await?;
        self.notify(LedgerChange::Expenses);
        Ok(())
    }

    async fn update_expense(&self, expense: Expense) -> Result<Expense, FundError> {
        let updated = self
            .run(move |conn| {
                let tx = conn.transaction()?;
                let stored =
                    load_expense(&tx, &expense.id)?.ok_or_else(|| FundError::ExpenseNotFound(expense.id.clone()))?;
                if stored.amount != expense.amount && is_linked(&tx, &expense.id)? {
                    return Err(FundError::ExpenseInUse(expense.id));
                }
                let updated = Expense {
                    amount_reimbursed: stored.amount_reimbursed,
                    sharing_status: stored.sharing_status,
                    ..expense
                };
                tx.execute(
                    "UPDATE expenses SET amount = ?1, expense_date = ?2, description = ?3, category = ?4, \
                     notes = ?5 WHERE id = ?6",
                    params![
                        updated.amount.to_string(),
                        updated.expense_date.to_string(),
                        updated.description,
                        updated.category.as_str(),
                        updated.notes,
                        updated.id,
                    ],
                )?;
                tx.commit()?;
                Ok(updated)
            })
            .await?;
        self.notify(LedgerChange::Expenses);
        Ok(updated)
    }

    async fn delete_expense(&self, expense_id: &str) -> Result<(), FundError> {
        let expense_id = expense_id.to_string();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            if load_expense(&tx, &expense_id)?.is_none() {
                return Err(FundError::ExpenseNotFound(expense_id));
            }
            if is_linked(&tx, &expense_id)? {
                return Err(FundError::ExpenseInUse(expense_id));
            }
            tx.execute("DELETE FROM expenses WHERE id = ?1", params![expense_id])?;
            tx.commit()?;
            Ok(())
        })
        .await?;
        self.notify(LedgerChange::Expenses);
        Ok(())
    }

    async fn list_fund_payments(&self) -> Result<Vec<FundPayment>, FundError> {
        self.run(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, employee_id, amount, payment_date, months_covered, payment_method, notes \
                 FROM fund_payments ORDER BY payment_date DESC",
            )?;
            let payments = stmt
                .query_map([], fund_payment_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(payments)
        })
        .await
    }

    async fn insert_fund_payment(&self, payment: FundPayment) -> Result<(), FundError> {
        let months = serde_json::to_string(&payment.months_covered)
            .map_err(|e| FundError::DatabaseError(format!("Failed to encode months covered: {}", e)))?;
        self.run(move |conn| {
            let known: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM employees WHERE id = ?1)",
                params![payment.employee_id],
                |row| row.get(0),
            )?;
            if !known {
                return Err(FundError::EmployeeNotFound(payment.employee_id));
            }
            conn.execute(
                "INSERT INTO fund_payments (id, employee_id, amount, payment_date, months_covered, payment_method, \
                 notes) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    payment.id,
                    payment.employee_id,
                    payment.amount.to_string(),
                    payment.payment_date.to_string(),
                    months,
                    payment.payment_method.as_str(),
                    payment.notes,
                ],
            )?;
            Ok(())
        })
        .await?;
        self.notify(LedgerChange::FundPayments);
        Ok(())
    }

    async fn get_bill_sharing_history(&self) -> Result<Vec<BillSharingDetail>, FundError> {
        self.run(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, total_amount, sharing_date, status, created_at FROM bill_sharing \
                 ORDER BY created_at DESC, rowid DESC",
            )?;
            let sharings = stmt
                .query_map([], sharing_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            sharings.into_iter().map(|s| load_detail(conn, s)).collect()
        })
        .await
    }

    async fn get_bill_sharing(&self, sharing_id: &str) -> Result<Option<BillSharingDetail>, FundError> {
        let sharing_id = sharing_id.to_string();
        self.run(move |conn| {
            let sharing = conn
                .query_row(
                    "SELECT id, total_amount, sharing_date, status, created_at FROM bill_sharing WHERE id = ?1",
                    params![sharing_id],
                    sharing_from_row,
                )
                .optional()?;
            sharing.map(|s| load_detail(conn, s)).transpose()
        })
        .await
    }

    async fn get_participant(&self, participant_id: &str) -> Result<Option<BillSharingParticipant>, FundError> {
        let participant_id = participant_id.to_string();
        self.run(move |conn| {
            let sql = format!(
                "SELECT {} FROM bill_sharing_participants WHERE id = ?1",
                PARTICIPANT_COLUMNS
            );
            Ok(conn
                .query_row(&sql, params![participant_id], participant_from_row)
                .optional()?)
        })
        .await
    }

    async fn insert_bill_sharing(&self, sharing: BillSharing) -> Result<(), FundError> {
        let sharing_id = sharing.id.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO bill_sharing (id, total_amount, sharing_date, status, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    sharing.id,
                    sharing.total_amount.to_string(),
                    sharing.sharing_date.to_string(),
                    sharing.status.as_str(),
                    timestamp(&sharing.created_at),
                ],
            )?;
            Ok(())
        })
        .await?;
        self.notify(LedgerChange::BillSharing(sharing_id));
        Ok(())
    }

    async fn insert_bill_sharing_expenses(&self, rows: Vec<BillSharingExpense>) -> Result<(), FundError> {
        let first = rows.first().map(|r| r.bill_sharing_id.clone());
        self.run(move |conn| {
            let tx = conn.transaction()?;
            for row in &rows {
                if load_expense(&tx, &row.expense_id)?.is_none() {
                    return Err(FundError::ExpenseNotFound(row.expense_id.clone()));
                }
                sharing_state(&tx, &row.bill_sharing_id)?;
                tx.execute(
                    "INSERT INTO bill_sharing_expenses (id, bill_sharing_id, expense_id, amount) \
                     VALUES (?1, ?2, ?3, ?4)",
                    params![row.id, row.bill_sharing_id, row.expense_id, row.amount.to_string()],
                )?;
                tx.execute(
                    "UPDATE expenses SET sharing_status = ?1 WHERE id = ?2 AND sharing_status = ?3",
                    params![
                        SharingStatus::Shared.as_str(),
                        row.expense_id,
                        SharingStatus::NotShared.as_str()
                    ],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await?;
        self.notify(LedgerChange::Expenses);
        if let Some(sharing_id) = first {
            self.notify(LedgerChange::BillSharing(sharing_id));
        }
        Ok(())
    }

    async fn insert_bill_sharing_participants(&self, rows: Vec<BillSharingParticipant>) -> Result<(), FundError> {
        let first = rows.first().map(|r| r.bill_sharing_id.clone());
        self.run(move |conn| {
            let tx = conn.transaction()?;
            for row in &rows {
                sharing_state(&tx, &row.bill_sharing_id)?;
                tx.execute(
                    "INSERT INTO bill_sharing_participants (id, bill_sharing_id, employee_id, amount_owed, \
                     is_birthday_person, payment_method, payment_status, payment_date) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        row.id,
                        row.bill_sharing_id,
                        row.employee_id,
                        row.amount_owed.to_string(),
                        row.is_birthday_person,
                        row.payment_method.as_str(),
                        row.payment_status.as_str(),
                        row.payment_date.as_ref().map(timestamp),
                    ],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await?;
        if let Some(sharing_id) = first {
            self.notify(LedgerChange::BillSharing(sharing_id));
        }
        Ok(())
    }

    async fn update_participant_status(
        &self,
        participant_id: &str,
        status: PaymentStatus,
        payment_date: Option<DateTime<Utc>>,
    ) -> Result<BillSharingParticipant, FundError> {
        let participant_id = participant_id.to_string();
        let updated = self
            .run(move |conn| {
                let changed = conn.execute(
                    "UPDATE bill_sharing_participants SET payment_status = ?1, payment_date = ?2 WHERE id = ?3",
                    params![status.as_str(), payment_date.as_ref().map(timestamp), participant_id],
                )?;
                if changed == 0 {
                    return Err(FundError::ParticipantNotFound(participant_id));
                }
                let sql = format!(
                    "SELECT {} FROM bill_sharing_participants WHERE id = ?1",
                    PARTICIPANT_COLUMNS
                );
                Ok(conn.query_row(&sql, params![participant_id], participant_from_row)?)
            })
            .await?;
        self.notify(LedgerChange::BillSharing(updated.bill_sharing_id.clone()));
        Ok(updated)
    }

    async fn call_finalize(&self, sharing_id: &str) -> Result<bool, FundError> {
        let id = sharing_id.to_string();
        let applied = self
            .run(move |conn| {
                let tx = conn.transaction()?;
                if sharing_state(&tx, &id)? == SharingState::Finalized {
                    debug!("Bill sharing {} already finalized, skipping", id);
                    return Ok(false);
                }

                for link in load_links(&tx, &id)? {
                    match load_expense(&tx, &link.expense_id)? {
                        Some(mut expense) => {
                            expense.apply_reimbursement(link.amount, true);
                            store_reimbursement(&tx, &expense)?;
                        }
                        None => warn!("Expense {} linked from {} is gone", link.expense_id, id),
                    }
                }
                tx.execute(
                    "UPDATE bill_sharing SET status = ?1 WHERE id = ?2",
                    params![SharingState::Finalized.as_str(), id],
                )?;
                tx.commit()?;
                Ok(true)
            })
            .await?;
        if applied {
            self.notify(LedgerChange::Expenses);
            self.notify(LedgerChange::BillSharing(sharing_id.to_string()));
        }
        Ok(applied)
    }

    async fn call_rollback_delete(&self, sharing_id: &str) -> Result<(), FundError> {
        let id = sharing_id.to_string();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            if sharing_state(&tx, &id)? != SharingState::Finalized {
                return Err(FundError::SharingNotFinalized(id));
            }

            let links = load_links(&tx, &id)?;
            delete_sharing_rows(&tx, &id)?;
            for link in &links {
                let linked = is_linked(&tx, &link.expense_id)?;
                if let Some(mut expense) = load_expense(&tx, &link.expense_id)? {
                    expense.apply_reimbursement(-link.amount, linked);
                    store_reimbursement(&tx, &expense)?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await?;

        self.notify(LedgerChange::Expenses);
        self.notify(LedgerChange::BillSharing(sharing_id.to_string()));
        Ok(())
    }

    async fn delete_pending_sharing_cascade(&self, sharing_id: &str) -> Result<(), FundError> {
        let id = sharing_id.to_string();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            if sharing_state(&tx, &id)? != SharingState::Pending {
                return Err(FundError::SharingNotPending(id));
            }

            let links = load_links(&tx, &id)?;
            delete_sharing_rows(&tx, &id)?;
            for link in &links {
                let linked = is_linked(&tx, &link.expense_id)?;
                if let Some(mut expense) = load_expense(&tx, &link.expense_id)? {
                    expense.refresh_sharing_status(linked);
                    store_reimbursement(&tx, &expense)?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await?;

        self.notify(LedgerChange::Expenses);
        self.notify(LedgerChange::BillSharing(sharing_id.to_string()));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<LedgerChange> {
        self.changes.subscribe()
    }
}
