//! The SQLite persistence layer: table creation, row mapping, and the
//! insert/select/update/delete operations used by the route handlers.

use chrono::{NaiveDate, Utc};
use common::{
    Amount, DatabaseID, Email, NewTransaction, NewUser, PasswordHash, Transaction,
    TransactionType, User, UserID,
};
use rusqlite::{
    params_from_iter, types::Value, Connection, Error, Row, Transaction as SqlTransaction,
};

/// Errors originating from operations on the app's database.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum DbError {
    /// The username already exists in the database. The client should try
    /// again with a different username.
    #[error("the username is already taken")]
    DuplicateUsername,

    /// The email already exists in the database. The client should try again
    /// with a different email address.
    #[error("the email address is already registered")]
    DuplicateEmail,

    /// A query was given an invalid foreign key. The client should check that
    /// the ids are valid.
    #[error("a query was given an invalid foreign key")]
    InvalidForeignKey,

    /// The row could not be found with the provided info (e.g., id). The
    /// client should try again with different parameters.
    #[error("the requested row could not be found")]
    NotFound,

    /// Wrapper for Sqlite errors not handled by the other enum entries.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(Error),
}

impl From<Error> for DbError {
    fn from(error: Error) -> Self {
        match error {
            // Code 787 occurs when a FOREIGN KEY constraint failed.
            Error::SqliteFailure(sql_error, Some(_)) if sql_error.extended_code == 787 => {
                DbError::InvalidForeignKey
            }
            // Code 2067 occurs when a UNIQUE constraint failed.
            Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("user.username") =>
            {
                DbError::DuplicateUsername
            }
            Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("user.email") =>
            {
                DbError::DuplicateEmail
            }
            Error::QueryReturnedNoRows => DbError::NotFound,
            e => DbError::SqlError(e),
        }
    }
}

/// A trait for adding an object schema to a database.
pub trait CreateTable {
    /// Create a table for the model.
    ///
    /// # Errors
    /// Returns an error if the table already exists or if there is an SQL error.
    fn create_table(connection: &Connection) -> Result<(), DbError>;
}

/// A trait for mapping from a `rusqlite::Row` from a SQLite database to a concrete rust type.
pub trait MapRow {
    type ReturnType;

    /// Convert a row into a concrete type.
    ///
    /// **Note:** This function expects that the row object contains all the
    /// table columns in the order they were defined.
    ///
    /// # Errors
    /// Returns an error if a row item cannot be converted into the
    /// corresponding rust type, or if an invalid column index was used.
    fn map_row(row: &Row) -> Result<Self::ReturnType, Error> {
        Self::map_row_with_offset(row, 0)
    }

    /// Convert a row into a concrete type, reading from column `offset`
    /// onwards.
    ///
    /// The `offset` is useful in cases where tables have been joined and you
    /// want to construct two different types from the one query.
    ///
    /// # Errors
    /// Returns an error if a row item cannot be converted into the
    /// corresponding rust type, or if an invalid column index was used.
    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, Error>;
}

/// A trait for inserting a record into the application database.
pub trait Insert {
    type ResultType;

    /// Insert the object into the application database.
    ///
    /// # Errors
    ///
    /// This function will return an error if the insertion failed.
    fn insert(self, connection: &Connection) -> Result<Self::ResultType, DbError>;
}

/// A trait for retrieving records from the application database by a field of type `T`.
pub trait SelectBy<T> {
    type ResultType;

    /// Select records from the application database that match `field`.
    fn select(field: T, connection: &Connection) -> Result<Self::ResultType, DbError>;
}

/// A trait for applying changes to an existing record in the application database.
pub trait Update {
    type ResultType;

    /// Apply the changes described by `self` to the application database.
    ///
    /// # Errors
    ///
    /// This function will return an error if no matching record exists or if
    /// the update failed.
    fn update(self, connection: &Connection) -> Result<Self::ResultType, DbError>;
}

/// A trait for removing records from the application database by a key of type `T`.
pub trait Delete<T> {
    /// Delete the record matching `key` from the application database.
    ///
    /// # Errors
    ///
    /// This function will return an error if no matching record exists or if
    /// the deletion failed.
    fn delete(key: T, connection: &Connection) -> Result<(), DbError>;
}

impl CreateTable for User {
    fn create_table(connection: &Connection) -> Result<(), DbError> {
        connection.execute(
            "CREATE TABLE user (
                    id INTEGER PRIMARY KEY,
                    username TEXT UNIQUE NOT NULL,
                    password TEXT NOT NULL,
                    name TEXT NOT NULL,
                    email TEXT UNIQUE NOT NULL,
                    join_date TEXT NOT NULL,
                    profile_image TEXT
                    )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for User {
    type ReturnType = Self;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self, Error> {
        let id = UserID::new(row.get(offset)?);
        let username = row.get(offset + 1)?;
        let password_hash = PasswordHash::new_unchecked(row.get(offset + 2)?);
        let name = row.get(offset + 3)?;
        let email = Email::new_unchecked(row.get(offset + 4)?);
        let join_date = row.get(offset + 5)?;
        let profile_image = row.get(offset + 6)?;

        Ok(Self::new(
            id,
            username,
            password_hash,
            name,
            email,
            join_date,
            profile_image,
        ))
    }
}

impl Insert for NewUser {
    type ResultType = User;

    /// Create a new user in the database.
    ///
    /// The join date is stamped with today's date.
    ///
    /// # Errors
    /// This function will return an error if the username or email is already
    /// registered, or if there is some other SQL error.
    fn insert(self, connection: &Connection) -> Result<Self::ResultType, DbError> {
        let join_date = Utc::now().date_naive();

        connection.execute(
            "INSERT INTO user (username, password, name, email, join_date) VALUES (?1, ?2, ?3, ?4, ?5)",
            (
                &self.username,
                self.password_hash.as_ref(),
                &self.name,
                self.email.as_str(),
                &join_date,
            ),
        )?;

        let id = UserID::new(connection.last_insert_rowid());

        Ok(User::new(
            id,
            self.username,
            self.password_hash,
            self.name,
            self.email,
            join_date,
            None,
        ))
    }
}

impl SelectBy<UserID> for User {
    type ResultType = Self;

    /// Get the user from the database that has the specified `id`.
    ///
    /// # Errors
    /// This function will return an error if there is no user with the
    /// specified id, or if there is an SQL error.
    fn select(id: UserID, connection: &Connection) -> Result<Self::ResultType, DbError> {
        connection
            .prepare(
                "SELECT id, username, password, name, email, join_date, profile_image
                FROM user WHERE id = :id",
            )?
            .query_row(&[(":id", &id.as_i64())], User::map_row)
            .map_err(|e| e.into())
    }
}

impl SelectBy<&str> for User {
    type ResultType = Self;

    /// Get the user from the database that has the specified `username`.
    ///
    /// # Errors
    /// This function will return an error if there is no user with the
    /// specified username, or if there is an SQL error.
    fn select(username: &str, connection: &Connection) -> Result<Self::ResultType, DbError> {
        connection
            .prepare(
                "SELECT id, username, password, name, email, join_date, profile_image
                FROM user WHERE username = :username",
            )?
            .query_row(&[(":username", &username)], User::map_row)
            .map_err(|e| e.into())
    }
}

/// The editable fields of a user's profile.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub user_id: UserID,
    pub name: String,
    pub email: Email,
    pub profile_image: Option<String>,
}

impl Update for ProfileUpdate {
    type ResultType = User;

    /// Update the name, email, and profile image of the user `user_id`.
    ///
    /// # Errors
    /// This function will return an error if `user_id` does not refer to a
    /// valid user, if the new email is already registered to another user, or
    /// if there is some other SQL error.
    fn update(self, connection: &Connection) -> Result<Self::ResultType, DbError> {
        let rows_updated = connection.execute(
            "UPDATE user SET name = ?1, email = ?2, profile_image = ?3 WHERE id = ?4",
            (
                &self.name,
                self.email.as_str(),
                &self.profile_image,
                self.user_id.as_i64(),
            ),
        )?;

        if rows_updated == 0 {
            return Err(DbError::NotFound);
        }

        User::select(self.user_id, connection)
    }
}

impl CreateTable for Transaction {
    fn create_table(connection: &Connection) -> Result<(), DbError> {
        connection.execute(
            "CREATE TABLE \"transaction\" (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    amount REAL NOT NULL,
                    type TEXT NOT NULL,
                    date TEXT NOT NULL,
                    user_id INTEGER NOT NULL,
                    FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                    )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for Transaction {
    type ReturnType = Self;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self, Error> {
        let raw_type: String = row.get(offset + 3)?;
        let transaction_type = raw_type.parse::<TransactionType>().map_err(|e| {
            Error::FromSqlConversionFailure(offset + 3, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(Self::new(
            row.get(offset)?,
            row.get(offset + 1)?,
            Amount::new_unchecked(row.get(offset + 2)?),
            transaction_type,
            row.get(offset + 4)?,
            UserID::new(row.get(offset + 5)?),
        ))
    }
}

/// A client-supplied transaction paired with the user that owns it.
#[derive(Debug, Clone)]
pub struct TransactionData {
    pub name: String,
    pub amount: Amount,
    pub transaction_type: TransactionType,
    pub date: NaiveDate,
    pub user_id: UserID,
}

impl TransactionData {
    /// Attach the owning user to a client payload.
    pub fn new(details: NewTransaction, user_id: UserID) -> Self {
        Self {
            name: details.name,
            amount: details.amount,
            transaction_type: details.transaction_type,
            date: details.date,
            user_id,
        }
    }
}

impl Insert for TransactionData {
    type ResultType = Transaction;

    /// Create a new transaction in the database.
    ///
    /// # Errors
    /// This function will return an error if:
    /// - `user_id` does not refer to a valid user,
    /// - or there is some other SQL error.
    fn insert(self, connection: &Connection) -> Result<Self::ResultType, DbError> {
        connection.execute(
            "INSERT INTO \"transaction\" (name, amount, type, date, user_id) VALUES (?1, ?2, ?3, ?4, ?5)",
            (
                &self.name,
                self.amount.as_f64(),
                self.transaction_type.as_str(),
                &self.date,
                self.user_id.as_i64(),
            ),
        )?;

        let transaction_id = connection.last_insert_rowid();

        Ok(Transaction::new(
            transaction_id,
            self.name,
            self.amount,
            self.transaction_type,
            self.date,
            self.user_id,
        ))
    }
}

impl SelectBy<DatabaseID> for Transaction {
    type ResultType = Self;

    /// Retrieve a transaction in the database by its `id`.
    ///
    /// Ownership is **not** checked here; the route handlers compare the
    /// returned transaction's user id against the authenticated user.
    ///
    /// # Errors
    /// This function will return an error if:
    /// - `id` does not refer to a valid transaction,
    /// - or there is some other SQL error.
    fn select(id: DatabaseID, connection: &Connection) -> Result<Self::ResultType, DbError> {
        let transaction = connection
            .prepare(
                "SELECT id, name, amount, type, date, user_id FROM \"transaction\" WHERE id = :id",
            )?
            .query_row(&[(":id", &id)], Transaction::map_row)?;

        Ok(transaction)
    }
}

/// The order to sort transactions by date in a [TransactionFilter].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Oldest first. Used for chart data so buckets fill in date order.
    Ascending,
    /// Newest first. The default for transaction listings.
    Descending,
}

/// Defines which of a user's transactions to fetch and in what order.
#[derive(Debug, Clone)]
pub struct TransactionFilter {
    /// Only this user's transactions are returned.
    pub user_id: UserID,
    /// Restrict results to one transaction type.
    pub transaction_type: Option<TransactionType>,
    /// Restrict results to names containing this substring
    /// (case-insensitive).
    pub search: Option<String>,
    /// Date ordering of the results.
    pub order: SortOrder,
}

impl TransactionFilter {
    /// A filter matching all of `user_id`'s transactions, newest first.
    pub fn for_user(user_id: UserID) -> Self {
        Self {
            user_id,
            transaction_type: None,
            search: None,
            order: SortOrder::Descending,
        }
    }
}

impl SelectBy<&TransactionFilter> for Transaction {
    type ResultType = Vec<Self>;

    /// Retrieve the transactions in the database that match `filter`.
    ///
    /// # Errors
    /// This function will return an error if there is an SQL error.
    fn select(
        filter: &TransactionFilter,
        connection: &Connection,
    ) -> Result<Self::ResultType, DbError> {
        let mut query_string =
            "SELECT id, name, amount, type, date, user_id FROM \"transaction\" WHERE user_id = ?1"
                .to_string();
        let mut query_parameters = vec![Value::Integer(filter.user_id.as_i64())];

        if let Some(transaction_type) = filter.transaction_type {
            query_string.push_str(&format!(" AND type = ?{}", query_parameters.len() + 1));
            query_parameters.push(Value::Text(transaction_type.as_str().to_string()));
        }

        if let Some(ref search) = filter.search {
            // LIKE is case-insensitive for ASCII in SQLite, which matches the
            // client's expectation for name search.
            query_string.push_str(&format!(" AND name LIKE ?{}", query_parameters.len() + 1));
            query_parameters.push(Value::Text(format!("%{search}%")));
        }

        // Ties on date are broken by id so that pagination-free listings are
        // stable across calls.
        match filter.order {
            SortOrder::Ascending => query_string.push_str(" ORDER BY date ASC, id ASC"),
            SortOrder::Descending => query_string.push_str(" ORDER BY date DESC, id DESC"),
        }

        connection
            .prepare(&query_string)?
            .query_map(params_from_iter(query_parameters), Transaction::map_row)?
            .map(|maybe_transaction| maybe_transaction.map_err(DbError::SqlError))
            .collect()
    }
}

/// The data needed to overwrite an existing transaction.
#[derive(Debug, Clone)]
pub struct TransactionUpdate {
    pub id: DatabaseID,
    pub name: String,
    pub amount: Amount,
    pub transaction_type: TransactionType,
    pub date: NaiveDate,
    pub user_id: UserID,
}

impl TransactionUpdate {
    /// Describe an update of transaction `id` with the fields of `details`,
    /// scoped to the owning user.
    pub fn new(id: DatabaseID, details: NewTransaction, user_id: UserID) -> Self {
        Self {
            id,
            name: details.name,
            amount: details.amount,
            transaction_type: details.transaction_type,
            date: details.date,
            user_id,
        }
    }
}

impl Update for TransactionUpdate {
    type ResultType = Transaction;

    /// Overwrite the fields of an existing transaction.
    ///
    /// The update is scoped to the owning user: updating another user's
    /// transaction reports [DbError::NotFound], the same as updating a
    /// transaction that does not exist.
    ///
    /// # Errors
    /// This function will return an error if no matching transaction exists
    /// or if there is some other SQL error.
    fn update(self, connection: &Connection) -> Result<Self::ResultType, DbError> {
        let rows_updated = connection.execute(
            "UPDATE \"transaction\" SET name = ?1, amount = ?2, type = ?3, date = ?4
            WHERE id = ?5 AND user_id = ?6",
            (
                &self.name,
                self.amount.as_f64(),
                self.transaction_type.as_str(),
                &self.date,
                self.id,
                self.user_id.as_i64(),
            ),
        )?;

        if rows_updated == 0 {
            return Err(DbError::NotFound);
        }

        Ok(Transaction::new(
            self.id,
            self.name,
            self.amount,
            self.transaction_type,
            self.date,
            self.user_id,
        ))
    }
}

impl Delete<(DatabaseID, UserID)> for Transaction {
    /// Delete the transaction `id` owned by `user_id`.
    ///
    /// Deleting another user's transaction reports [DbError::NotFound], the
    /// same as deleting a transaction that does not exist.
    ///
    /// # Errors
    /// This function will return an error if no matching transaction exists
    /// or if there is some other SQL error.
    fn delete((id, user_id): (DatabaseID, UserID), connection: &Connection) -> Result<(), DbError> {
        let rows_deleted = connection.execute(
            "DELETE FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
            (id, user_id.as_i64()),
        )?;

        if rows_deleted == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }
}

/// Create the application's tables in `connection`.
///
/// # Errors
/// This function will return an error if any of the tables already exist or
/// if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), DbError> {
    // SQLite does not enforce foreign keys unless asked to.
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    User::create_table(&transaction)?;
    Transaction::create_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
