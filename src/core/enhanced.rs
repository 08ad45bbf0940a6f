//! Enhanced transactions
//!
//! Superset of [`Transaction`] adding a kind (standard, multi-signature,
//! time-locked, contract), collected signatures and free-form metadata.
//! Cryptographic signature checks belong to the wallet; here a signature is
//! only checked for structure and signer authorization.

use crate::core::transaction::{validate_fields, Transaction, TransactionError};
use crate::crypto::digest_json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Kind of an enhanced transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Standard,
    MultiSig,
    TimeLock,
    Contract,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Standard => "standard",
            Self::MultiSig => "multisig",
            Self::TimeLock => "timelock",
            Self::Contract => "contract",
        };
        f.write_str(name)
    }
}

/// A signature with the signer's public key, produced by the wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSignature {
    pub public_key: String,
    pub signature: String,
    pub signer: String,
}

impl TransactionSignature {
    pub fn new(public_key: &str, signature: &str, signer: &str) -> Self {
        Self {
            public_key: public_key.to_string(),
            signature: signature.to_string(),
            signer: signer.to_string(),
        }
    }

    /// Structural check only: every part must be present
    pub fn is_well_formed(&self) -> bool {
        !self.public_key.is_empty() && !self.signature.is_empty() && !self.signer.is_empty()
    }
}

#[derive(Serialize)]
struct IdDigest<'a> {
    tx_type: TransactionType,
    from: &'a str,
    to: &'a str,
    amount: f64,
    timestamp: i64,
}

#[derive(Serialize)]
struct HashDigest<'a> {
    id: &'a str,
    tx_type: TransactionType,
    from: &'a str,
    to: &'a str,
    amount: f64,
    fee: f64,
    timestamp: i64,
    required_sigs: usize,
    signers: &'a [String],
    lock_time: i64,
    metadata: &'a BTreeMap<String, Value>,
    contract_code: &'a str,
    contract_data: &'a str,
}

/// Transaction with multi-signature, time-lock or contract semantics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedTransaction {
    /// Digest over type/from/to/amount/timestamp
    pub id: String,
    pub tx_type: TransactionType,
    pub from: String,
    pub to: String,
    pub amount: f64,
    pub fee: f64,
    /// Creation time (Unix seconds)
    pub timestamp: i64,
    /// Digest over every field except the signatures
    pub hash: String,
    signatures: Vec<TransactionSignature>,
    metadata: BTreeMap<String, Value>,
    /// Signatures needed before execution (multi-sig only)
    #[serde(default)]
    pub required_sigs: usize,
    /// Authorized signers (multi-sig only)
    #[serde(default)]
    pub signers: Vec<String>,
    /// Unix timestamp from which the transaction may execute (time-lock only)
    #[serde(default)]
    pub lock_time: i64,
    #[serde(default)]
    pub contract_code: String,
    #[serde(default)]
    pub contract_data: String,
}

impl EnhancedTransaction {
    fn base(tx_type: TransactionType, from: &str, to: &str, amount: f64, fee: f64) -> Self {
        Self {
            id: String::new(),
            tx_type,
            from: from.to_string(),
            to: to.to_string(),
            amount,
            fee,
            timestamp: Utc::now().timestamp(),
            hash: String::new(),
            signatures: Vec::new(),
            metadata: BTreeMap::new(),
            required_sigs: 0,
            signers: Vec::new(),
            lock_time: 0,
            contract_code: String::new(),
            contract_data: String::new(),
        }
    }

    fn sealed(mut self) -> Self {
        self.id = self.generate_id();
        self.hash = self.calculate_hash();
        self
    }

    /// Create a standard enhanced transaction
    pub fn standard(from: &str, to: &str, amount: f64, fee: f64) -> Self {
        Self::base(TransactionType::Standard, from, to, amount, fee).sealed()
    }

    /// Create an M-of-N multi-signature transaction
    pub fn multisig(
        from: &str,
        to: &str,
        amount: f64,
        fee: f64,
        required_sigs: usize,
        signers: Vec<String>,
    ) -> Self {
        let mut tx = Self::base(TransactionType::MultiSig, from, to, amount, fee);
        tx.required_sigs = required_sigs;
        tx.signers = signers;
        tx.sealed()
    }

    /// Create a transaction that cannot execute before `lock_time`
    pub fn timelock(from: &str, to: &str, amount: f64, fee: f64, lock_time: i64) -> Self {
        let mut tx = Self::base(TransactionType::TimeLock, from, to, amount, fee);
        tx.lock_time = lock_time;
        tx.sealed()
    }

    /// Create a contract transaction carrying code and call data
    pub fn contract(from: &str, to: &str, amount: f64, fee: f64, code: &str, data: &str) -> Self {
        let mut tx = Self::base(TransactionType::Contract, from, to, amount, fee);
        tx.contract_code = code.to_string();
        tx.contract_data = data.to_string();
        tx.sealed()
    }

    /// Attach metadata at construction time
    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.set_metadata(key, value);
        self
    }

    fn generate_id(&self) -> String {
        digest_json(&IdDigest {
            tx_type: self.tx_type,
            from: &self.from,
            to: &self.to,
            amount: self.amount,
            timestamp: self.timestamp,
        })
    }

    /// Recompute the content hash from the current field values
    pub fn calculate_hash(&self) -> String {
        digest_json(&HashDigest {
            id: &self.id,
            tx_type: self.tx_type,
            from: &self.from,
            to: &self.to,
            amount: self.amount,
            fee: self.fee,
            timestamp: self.timestamp,
            required_sigs: self.required_sigs,
            signers: &self.signers,
            lock_time: self.lock_time,
            metadata: &self.metadata,
            contract_code: &self.contract_code,
            contract_data: &self.contract_data,
        })
    }

    pub fn verify_hash(&self) -> bool {
        self.hash == self.calculate_hash()
    }

    pub fn metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Set a metadata entry; the hash is recomputed
    pub fn set_metadata(&mut self, key: &str, value: Value) {
        self.metadata.insert(key.to_string(), value);
        self.hash = self.calculate_hash();
    }

    pub fn signatures(&self) -> &[TransactionSignature] {
        &self.signatures
    }

    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    /// Validate the fields and the kind-specific parameters at time `now`
    pub fn validate_at(&self, now: i64) -> Result<(), TransactionError> {
        validate_fields(&self.from, &self.to, self.amount, self.fee)?;

        match self.tx_type {
            TransactionType::MultiSig => {
                if self.signers.is_empty() {
                    return Err(TransactionError::InvalidMultiSig(
                        "no signers specified".to_string(),
                    ));
                }
                if self.required_sigs == 0 || self.required_sigs > self.signers.len() {
                    return Err(TransactionError::InvalidMultiSig(format!(
                        "{} required signatures with {} signers",
                        self.required_sigs,
                        self.signers.len()
                    )));
                }
            }
            TransactionType::TimeLock => {
                if self.lock_time <= 0 {
                    return Err(TransactionError::InvalidTimeLock(
                        "invalid lock time".to_string(),
                    ));
                }
                if self.lock_time <= now {
                    return Err(TransactionError::InvalidTimeLock(
                        "lock time must be in the future".to_string(),
                    ));
                }
            }
            TransactionType::Standard | TransactionType::Contract => {}
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), TransactionError> {
        self.validate_at(Utc::now().timestamp())
    }

    /// Add a signature. Rejected signatures leave the transaction unchanged.
    pub fn add_signature(&mut self, signature: TransactionSignature) -> Result<(), TransactionError> {
        if !signature.is_well_formed() {
            return Err(TransactionError::InvalidSignature);
        }

        if self.signatures.iter().any(|s| s.signer == signature.signer) {
            return Err(TransactionError::DuplicateSigner(signature.signer));
        }

        if self.tx_type == TransactionType::MultiSig && !self.signers.contains(&signature.signer) {
            return Err(TransactionError::UnauthorizedSigner(signature.signer));
        }

        self.signatures.push(signature);
        Ok(())
    }

    /// Multi-sig needs `required_sigs` signatures, every other kind needs one
    pub fn is_fully_signed(&self) -> bool {
        match self.tx_type {
            TransactionType::MultiSig => self.signatures.len() >= self.required_sigs,
            TransactionType::Standard | TransactionType::TimeLock | TransactionType::Contract => {
                !self.signatures.is_empty()
            }
        }
    }

    /// Fully signed and, for time-locks, `now` has reached the lock time
    pub fn is_executable_at(&self, now: i64) -> bool {
        if !self.is_fully_signed() {
            return false;
        }

        if self.tx_type == TransactionType::TimeLock && self.lock_time > 0 {
            return now >= self.lock_time;
        }

        true
    }

    pub fn is_executable(&self) -> bool {
        self.is_executable_at(Utc::now().timestamp())
    }

    /// Flatten into a plain transaction for block inclusion. The result is
    /// hashed as a standard transaction, so it verifies inside a block.
    pub fn to_standard(&self) -> Transaction {
        Transaction::new(&self.from, &self.to, self.amount, self.fee)
    }
}
