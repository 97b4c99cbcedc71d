use chrono::NaiveDate;
use std::cmp::Ordering;
use tally_core::Statement;

use crate::util::{normalize_identifier, normalize_text, present};

/// Reports whether `a` and `b` denote the same bank transaction.
///
/// Equal hash numbers are sufficient. Otherwise value and currency must agree,
/// the valuta or booking date must be identical, and either the counterparty
/// (remote account or IBAN) or the normalized purpose must be the same.
/// Symmetric in its arguments.
pub fn matches(a: &Statement, b: &Statement) -> bool {
    if a.hash_number() == b.hash_number() {
        return true;
    }
    if a.value() != b.value() {
        return false;
    }
    if normalize_identifier(&a.currency) != normalize_identifier(&b.currency) {
        return false;
    }
    if !same_date(a.valuta_date, b.valuta_date) && !same_date(a.date, b.date) {
        return false;
    }
    same_identifier(&a.remote_account, &b.remote_account)
        || same_identifier(&a.remote_iban, &b.remote_iban)
        || same_purpose(a, b)
}

/// Like [`matches`], and on a match fills every empty field of `stored` from
/// `incoming`. Populated fields are never overwritten.
pub fn matches_and_repair(stored: &mut Statement, incoming: &Statement) -> bool {
    if !matches(stored, incoming) {
        return false;
    }
    repair(stored, incoming);
    true
}

/// Copies fields that are empty in `stored` but present in `incoming`.
/// Returns how many fields were filled.
pub fn repair(stored: &mut Statement, incoming: &Statement) -> usize {
    let text_fields = [
        (&mut stored.remote_name, &incoming.remote_name),
        (&mut stored.remote_iban, &incoming.remote_iban),
        (&mut stored.remote_bic, &incoming.remote_bic),
        (&mut stored.remote_bank_code, &incoming.remote_bank_code),
        (&mut stored.remote_bank_name, &incoming.remote_bank_name),
        (&mut stored.remote_bank_location, &incoming.remote_bank_location),
        (&mut stored.remote_account, &incoming.remote_account),
        (&mut stored.remote_country, &incoming.remote_country),
        (&mut stored.remote_suffix, &incoming.remote_suffix),
        (&mut stored.local_bank_code, &incoming.local_bank_code),
        (&mut stored.local_account, &incoming.local_account),
        (&mut stored.local_suffix, &incoming.local_suffix),
        (&mut stored.purpose, &incoming.purpose),
        (&mut stored.transaction_text, &incoming.transaction_text),
        (&mut stored.customer_reference, &incoming.customer_reference),
        (&mut stored.bank_reference, &incoming.bank_reference),
        (&mut stored.prima_nota, &incoming.prima_nota),
        (&mut stored.additional, &incoming.additional),
        (&mut stored.ref1, &incoming.ref1),
        (&mut stored.ref2, &incoming.ref2),
        (&mut stored.ref3, &incoming.ref3),
        (&mut stored.ref4, &incoming.ref4),
    ];
    let mut filled = text_fields
        .into_iter()
        .map(|(dst, src)| fill_text(dst, src))
        .filter(|&f| f)
        .count();

    filled += usize::from(fill(&mut stored.valuta_date, incoming.valuta_date));
    filled += usize::from(fill(&mut stored.date, incoming.date));
    filled += usize::from(fill(&mut stored.saldo, incoming.saldo));
    filled += usize::from(fill(&mut stored.transaction_code, incoming.transaction_code));
    if stored.currency.trim().is_empty() && !incoming.currency.trim().is_empty() {
        stored.currency = incoming.currency.clone();
        filled += 1;
    }
    filled
}

/// Chronological order by valuta date with booking-date fallback; undated
/// records go last.
pub fn compare_valuta(a: &Statement, b: &Statement) -> Ordering {
    a.compare_valuta(b)
}

/// Index pairs `(i, j)` with `i < j` of statements inside one slice that
/// match each other.
pub fn find_duplicates(statements: &[Statement]) -> Vec<(usize, usize)> {
    let mut duplicates = Vec::new();

    for i in 0..statements.len() {
        for j in (i + 1)..statements.len() {
            if matches(&statements[i], &statements[j]) {
                duplicates.push((i, j));
            }
        }
    }

    duplicates
}

fn same_date(a: Option<NaiveDate>, b: Option<NaiveDate>) -> bool {
    matches!((a, b), (Some(x), Some(y)) if x == y)
}

fn same_identifier(a: &Option<String>, b: &Option<String>) -> bool {
    match (present(a), present(b)) {
        (Some(x), Some(y)) => normalize_identifier(x) == normalize_identifier(y),
        _ => false,
    }
}

fn same_purpose(a: &Statement, b: &Statement) -> bool {
    match (present(&a.purpose), present(&b.purpose)) {
        (Some(x), Some(y)) => normalize_text(x) == normalize_text(y),
        _ => false,
    }
}

fn fill_text(dst: &mut Option<String>, src: &Option<String>) -> bool {
    if present(dst).is_some() {
        return false;
    }
    match present(src) {
        Some(_) => {
            dst.clone_from(src);
            true
        }
        None => false,
    }
}

fn fill<T: Copy>(dst: &mut Option<T>, src: Option<T>) -> bool {
    if dst.is_none() && src.is_some() {
        *dst = src;
        true
    } else {
        false
    }
}
