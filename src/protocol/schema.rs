//! The protocol tag tables.
//!
//! Every element type and context of the message vocabulary, declared as
//! statics and assembled once into the process-wide [`Registry`]. The
//! numbering conventions:
//!
//! - root-level message tags are four bytes wide;
//! - tags inside a message context are a single byte;
//! - a structural tag's last byte is odd, a terminal tag's is even, so
//!   decoders that do not know a tag can still skip it correctly.
//!
//! Context scoping makes single-byte codes reusable: `0xD1` is a field
//! list inside an entry and a single field inside that list, with no
//! ambiguity. The signed-element context is a shared parent of the entry
//! header and cheque contexts, giving both the same signer/signature
//! tags.

use crate::core::registry::{ContextId, ElementDef, Registry, RegistryBuilder};
use once_cell::sync::Lazy;

// Contexts, declared in dependency order: parents before children.
pub const CTX_ROOT: ContextId = ContextId(0);
pub const CTX_SIGNED: ContextId = ContextId(1);
pub const CTX_MODIFICATION_REQUEST: ContextId = ContextId(2);
pub const CTX_ENTRY: ContextId = ContextId(3);
pub const CTX_ENTRY_HEADER: ContextId = ContextId(4);
pub const CTX_FIELD_LIST: ContextId = ContextId(5);
pub const CTX_FIELD: ContextId = ContextId(6);
pub const CTX_CHEQUE_LIST: ContextId = ContextId(7);
pub const CTX_CHEQUE: ContextId = ContextId(8);
pub const CTX_ADDRESS_LIST: ContextId = ContextId(9);
pub const CTX_MODIFICATION_RESPONSE: ContextId = ContextId(10);
pub const CTX_RESULT_SUCCESS: ContextId = ContextId(11);
pub const CTX_RESULT_ERROR: ContextId = ContextId(12);
pub const CTX_RECOLLECTION_REQUEST: ContextId = ContextId(13);
pub const CTX_RETRIEVE_LIST: ContextId = ContextId(14);
pub const CTX_RETRIEVE_COMPUTE: ContextId = ContextId(15);
pub const CTX_FILTER_LIST: ContextId = ContextId(16);
pub const CTX_FILTER: ContextId = ContextId(17);
pub const CTX_FUNCTION: ContextId = ContextId(18);
pub const CTX_ARGUMENT_STATIC: ContextId = ContextId(19);
pub const CTX_RECOLLECTION_RESPONSE: ContextId = ContextId(20);
pub const CTX_RECOLLECTION_RESULT: ContextId = ContextId(21);
pub const CTX_COMPUTED_LIST: ContextId = ContextId(22);
pub const CTX_HEALING_REQUEST: ContextId = ContextId(23);
pub const CTX_HEALING_RESPONSE: ContextId = ContextId(24);
pub const CTX_SCHEMA_REQUEST: ContextId = ContextId(25);
pub const CTX_SCHEMA_RESPONSE: ContextId = ContextId(26);
pub const CTX_SCHEMA_FIELD: ContextId = ContextId(27);
pub const CTX_BILLING_REQUEST: ContextId = ContextId(28);
pub const CTX_BILLING_RESPONSE: ContextId = ContextId(29);
pub const CTX_ERROR: ContextId = ContextId(30);

// Root-level messages.
pub static MODIFICATION_REQUEST: ElementDef =
    ElementDef::container("ModificationRequest", 0x1E54_4945, CTX_MODIFICATION_REQUEST);
pub static MODIFICATION_RESPONSE: ElementDef =
    ElementDef::container("ModificationResponse", 0x1E54_4D53, CTX_MODIFICATION_RESPONSE);
pub static RECOLLECTION_REQUEST: ElementDef =
    ElementDef::container("RecollectionRequest", 0x1E52_4551, CTX_RECOLLECTION_REQUEST);
pub static RECOLLECTION_RESPONSE: ElementDef =
    ElementDef::container("RecollectionResponse", 0x1E52_4553, CTX_RECOLLECTION_RESPONSE);
pub static HEALING_REQUEST: ElementDef =
    ElementDef::container("HealingRequest", 0x1E48_4541, CTX_HEALING_REQUEST);
pub static HEALING_RESPONSE: ElementDef =
    ElementDef::container("HealingResponse", 0x1E48_4543, CTX_HEALING_RESPONSE);
pub static SCHEMA_REQUEST: ElementDef =
    ElementDef::container("SchemaRequest", 0x1E53_4351, CTX_SCHEMA_REQUEST);
pub static SCHEMA_RESPONSE: ElementDef =
    ElementDef::container("SchemaResponse", 0x1E53_4353, CTX_SCHEMA_RESPONSE);
pub static BILLING_REQUEST: ElementDef =
    ElementDef::container("BillingRequest", 0x1E42_4C51, CTX_BILLING_REQUEST);
pub static BILLING_RESPONSE: ElementDef =
    ElementDef::container("BillingResponse", 0x1E42_4C53, CTX_BILLING_RESPONSE);
pub static ERROR: ElementDef = ElementDef::container("Error", 0x7FFF, CTX_ERROR);

// Signed-element scope, shared by entry headers and cheques.
pub static SIGNER: ElementDef = ElementDef::value("Signer", 0xFC);
pub static SIGNATURE: ElementDef = ElementDef::value("Signature", 0xFE);

// Message body vocabulary.
pub static CONSISTENCY_KIND: ElementDef = ElementDef::value("ConsistencyKind", 0xCC);
pub static CONSISTENCY: ElementDef = ElementDef::value("Consistency", 0xCE);
pub static MESSAGE_ID: ElementDef = ElementDef::value("MessageId", 0xEC);
pub static ENTRY: ElementDef = ElementDef::container("Entry", 0xE1, CTX_ENTRY);

// Entry internals.
pub static ENTRY_HEADER: ElementDef =
    ElementDef::container("EntryHeader", 0xE1, CTX_ENTRY_HEADER);
pub static FIELD_LIST: ElementDef = ElementDef::container("FieldList", 0xD1, CTX_FIELD_LIST);
pub static CHEQUE_LIST: ElementDef =
    ElementDef::container("ChequeList", 0xC1, CTX_CHEQUE_LIST);

pub static TABLESPACE_NAME: ElementDef = ElementDef::value("TablespaceName", 0x80);
pub static TABLE_NAME: ElementDef = ElementDef::value("TableName", 0x82);
pub static ENTRY_TYPE: ElementDef = ElementDef::value("EntryType", 0x84);
pub static ENTRY_TIMESTAMP: ElementDef = ElementDef::value("EntryTimestamp", 0x86);
pub static ENTRY_VERSION: ElementDef = ElementDef::value("EntryVersion", 0x88);
pub static NETWORK_ID: ElementDef = ElementDef::value("NetworkId", 0x8A);
pub static OLD_HASH: ElementDef = ElementDef::value("OldHash", 0x8C);
pub static FIELDS_HASH: ElementDef = ElementDef::value("FieldsHash", 0x8E);

pub static FIELD: ElementDef = ElementDef::container("Field", 0xD1, CTX_FIELD);
pub static FIELD_NAME: ElementDef = ElementDef::value("FieldName", 0x80);
pub static FIELD_TYPE: ElementDef = ElementDef::value("FieldType", 0x82);
pub static FIELD_HASH: ElementDef = ElementDef::value("FieldHash", 0x84);
pub static FIELD_VALUE: ElementDef = ElementDef::value("FieldValue", 0x86);

// Cheque internals.
pub static CHEQUE: ElementDef = ElementDef::container("Cheque", 0xC1, CTX_CHEQUE);
pub static CHEQUE_SESSION: ElementDef = ElementDef::value("ChequeSession", 0x80);
pub static CHEQUE_NUMBER: ElementDef = ElementDef::value("ChequeNumber", 0x82);
pub static CHEQUE_TIMESTAMP: ElementDef = ElementDef::value("ChequeTimestamp", 0x84);
pub static CHEQUE_AMOUNT: ElementDef = ElementDef::value("ChequeAmount", 0x86);
pub static CHEQUE_NETWORK_ID: ElementDef = ElementDef::value("ChequeNetworkId", 0x88);
pub static CHEQUE_TABLESPACE: ElementDef = ElementDef::value("ChequeTablespace", 0x8A);
pub static CHEQUE_TABLE: ElementDef = ElementDef::value("ChequeTable", 0x8C);
pub static ADDRESS_LIST: ElementDef =
    ElementDef::container("AddressList", 0xA1, CTX_ADDRESS_LIST);
pub static ADDRESS: ElementDef = ElementDef::value("Address", 0xA0);

// Per-item operation results, shared by modification, healing, billing.
pub static RESULT_SUCCESS: ElementDef =
    ElementDef::container("ResultSuccess", 0xD3, CTX_RESULT_SUCCESS);
pub static RESULT_ERROR: ElementDef =
    ElementDef::container("ResultError", 0xD5, CTX_RESULT_ERROR);
pub static ENTRY_HASH: ElementDef = ElementDef::value("EntryHash", 0x80);
pub static ERROR_MESSAGE: ElementDef = ElementDef::value("ErrorMessage", 0xF0);

// Recollection internals.
pub static RETRIEVE_LIST: ElementDef =
    ElementDef::container("RetrieveList", 0xB1, CTX_RETRIEVE_LIST);
pub static RETRIEVE_FIELD: ElementDef = ElementDef::value("RetrieveField", 0x90);
pub static RETRIEVE_COMPUTE: ElementDef =
    ElementDef::container("RetrieveCompute", 0x91, CTX_RETRIEVE_COMPUTE);
pub static ALIAS: ElementDef = ElementDef::value("Alias", 0x94);
pub static RESULT_TYPE: ElementDef = ElementDef::value("ResultType", 0x96);
pub static FILTER_LIST: ElementDef =
    ElementDef::container("FilterList", 0xB3, CTX_FILTER_LIST);
pub static FILTER: ElementDef = ElementDef::container("Filter", 0xB5, CTX_FILTER);

pub static FUNCTION: ElementDef = ElementDef::container("Function", 0xF1, CTX_FUNCTION);
pub static FUNCTION_NAME: ElementDef = ElementDef::value("FunctionName", 0x80);
pub static ARGUMENT_REFERENCE: ElementDef = ElementDef::value("ArgumentReference", 0x92);
pub static ARGUMENT_STATIC: ElementDef =
    ElementDef::container("ArgumentStatic", 0x93, CTX_ARGUMENT_STATIC);
pub static ARGUMENT_TYPE: ElementDef = ElementDef::value("ArgumentType", 0x82);
pub static ARGUMENT_VALUE: ElementDef = ElementDef::value("ArgumentValue", 0x86);

pub static RECOLLECTION_RESULT: ElementDef =
    ElementDef::container("RecollectionResult", 0xE3, CTX_RECOLLECTION_RESULT);
pub static COMPUTED_LIST: ElementDef =
    ElementDef::container("ComputedList", 0xD9, CTX_COMPUTED_LIST);

// Schema internals.
pub static SCHEMA_FIELD: ElementDef =
    ElementDef::container("SchemaField", 0xD7, CTX_SCHEMA_FIELD);

// Framed error message internals.
pub static ERROR_CODE: ElementDef = ElementDef::value("ErrorCode", 0xE2);

static REGISTRY: Lazy<Registry> = Lazy::new(build_registry);

/// The process-wide tag registry, built on first use.
pub fn registry() -> &'static Registry {
    &REGISTRY
}

fn build_registry() -> Registry {
    let mut b = RegistryBuilder::new();

    b.context_as(CTX_ROOT, "Root", &[]);
    b.context_as(CTX_SIGNED, "Signed", &[]);
    b.context_as(CTX_MODIFICATION_REQUEST, "ModificationRequest", &[]);
    b.context_as(CTX_ENTRY, "Entry", &[]);
    b.context_as(CTX_ENTRY_HEADER, "EntryHeader", &[CTX_SIGNED]);
    b.context_as(CTX_FIELD_LIST, "FieldList", &[]);
    b.context_as(CTX_FIELD, "Field", &[]);
    b.context_as(CTX_CHEQUE_LIST, "ChequeList", &[]);
    b.context_as(CTX_CHEQUE, "Cheque", &[CTX_SIGNED]);
    b.context_as(CTX_ADDRESS_LIST, "AddressList", &[]);
    b.context_as(CTX_MODIFICATION_RESPONSE, "ModificationResponse", &[]);
    b.context_as(CTX_RESULT_SUCCESS, "ResultSuccess", &[]);
    b.context_as(CTX_RESULT_ERROR, "ResultError", &[]);
    b.context_as(CTX_RECOLLECTION_REQUEST, "RecollectionRequest", &[]);
    b.context_as(CTX_RETRIEVE_LIST, "RetrieveList", &[]);
    b.context_as(CTX_RETRIEVE_COMPUTE, "RetrieveCompute", &[]);
    b.context_as(CTX_FILTER_LIST, "FilterList", &[]);
    b.context_as(CTX_FILTER, "Filter", &[]);
    b.context_as(CTX_FUNCTION, "Function", &[]);
    b.context_as(CTX_ARGUMENT_STATIC, "ArgumentStatic", &[]);
    b.context_as(CTX_RECOLLECTION_RESPONSE, "RecollectionResponse", &[]);
    b.context_as(CTX_RECOLLECTION_RESULT, "RecollectionResult", &[]);
    b.context_as(CTX_COMPUTED_LIST, "ComputedList", &[]);
    b.context_as(CTX_HEALING_REQUEST, "HealingRequest", &[]);
    b.context_as(CTX_HEALING_RESPONSE, "HealingResponse", &[]);
    b.context_as(CTX_SCHEMA_REQUEST, "SchemaRequest", &[]);
    b.context_as(CTX_SCHEMA_RESPONSE, "SchemaResponse", &[]);
    b.context_as(CTX_SCHEMA_FIELD, "SchemaField", &[]);
    b.context_as(CTX_BILLING_REQUEST, "BillingRequest", &[]);
    b.context_as(CTX_BILLING_RESPONSE, "BillingResponse", &[]);
    b.context_as(CTX_ERROR, "Error", &[]);

    for def in [
        &MODIFICATION_REQUEST,
        &MODIFICATION_RESPONSE,
        &RECOLLECTION_REQUEST,
        &RECOLLECTION_RESPONSE,
        &HEALING_REQUEST,
        &HEALING_RESPONSE,
        &SCHEMA_REQUEST,
        &SCHEMA_RESPONSE,
        &BILLING_REQUEST,
        &BILLING_RESPONSE,
        &ERROR,
    ] {
        b.register(CTX_ROOT, def);
    }

    b.register(CTX_SIGNED, &SIGNER);
    b.register(CTX_SIGNED, &SIGNATURE);

    b.register(CTX_MODIFICATION_REQUEST, &CONSISTENCY_KIND);
    b.register(CTX_MODIFICATION_REQUEST, &CONSISTENCY);
    b.register(CTX_MODIFICATION_REQUEST, &MESSAGE_ID);
    b.register(CTX_MODIFICATION_REQUEST, &ENTRY);

    b.register(CTX_ENTRY, &ENTRY_HEADER);
    b.register(CTX_ENTRY, &FIELD_LIST);
    b.register(CTX_ENTRY, &CHEQUE_LIST);

    b.register(CTX_ENTRY_HEADER, &TABLESPACE_NAME);
    b.register(CTX_ENTRY_HEADER, &TABLE_NAME);
    b.register(CTX_ENTRY_HEADER, &ENTRY_TYPE);
    b.register(CTX_ENTRY_HEADER, &ENTRY_TIMESTAMP);
    b.register(CTX_ENTRY_HEADER, &ENTRY_VERSION);
    b.register(CTX_ENTRY_HEADER, &NETWORK_ID);
    b.register(CTX_ENTRY_HEADER, &OLD_HASH);
    b.register(CTX_ENTRY_HEADER, &FIELDS_HASH);

    b.register(CTX_FIELD_LIST, &FIELD);
    b.register(CTX_FIELD, &FIELD_NAME);
    b.register(CTX_FIELD, &FIELD_TYPE);
    b.register(CTX_FIELD, &FIELD_HASH);
    b.register(CTX_FIELD, &FIELD_VALUE);

    b.register(CTX_CHEQUE_LIST, &CHEQUE);
    b.register(CTX_CHEQUE, &CHEQUE_SESSION);
    b.register(CTX_CHEQUE, &CHEQUE_NUMBER);
    b.register(CTX_CHEQUE, &CHEQUE_TIMESTAMP);
    b.register(CTX_CHEQUE, &CHEQUE_AMOUNT);
    b.register(CTX_CHEQUE, &CHEQUE_NETWORK_ID);
    b.register(CTX_CHEQUE, &CHEQUE_TABLESPACE);
    b.register(CTX_CHEQUE, &CHEQUE_TABLE);
    b.register(CTX_CHEQUE, &ADDRESS_LIST);
    b.register(CTX_ADDRESS_LIST, &ADDRESS);

    b.register(CTX_MODIFICATION_RESPONSE, &MESSAGE_ID);
    b.register(CTX_MODIFICATION_RESPONSE, &RESULT_SUCCESS);
    b.register(CTX_MODIFICATION_RESPONSE, &RESULT_ERROR);
    b.register(CTX_RESULT_SUCCESS, &ENTRY_HASH);
    b.register(CTX_RESULT_ERROR, &ENTRY_HASH);
    b.register(CTX_RESULT_ERROR, &ERROR_MESSAGE);

    b.register(CTX_RECOLLECTION_REQUEST, &CONSISTENCY_KIND);
    b.register(CTX_RECOLLECTION_REQUEST, &CONSISTENCY);
    b.register(CTX_RECOLLECTION_REQUEST, &MESSAGE_ID);
    b.register(CTX_RECOLLECTION_REQUEST, &TABLESPACE_NAME);
    b.register(CTX_RECOLLECTION_REQUEST, &TABLE_NAME);
    b.register(CTX_RECOLLECTION_REQUEST, &RETRIEVE_LIST);
    b.register(CTX_RECOLLECTION_REQUEST, &FILTER_LIST);
    b.register(CTX_RECOLLECTION_REQUEST, &CHEQUE_LIST);

    b.register(CTX_RETRIEVE_LIST, &RETRIEVE_FIELD);
    b.register(CTX_RETRIEVE_LIST, &RETRIEVE_COMPUTE);
    b.register(CTX_RETRIEVE_COMPUTE, &FUNCTION);
    b.register(CTX_RETRIEVE_COMPUTE, &ALIAS);
    b.register(CTX_RETRIEVE_COMPUTE, &RESULT_TYPE);

    b.register(CTX_FILTER_LIST, &FILTER);
    b.register(CTX_FILTER, &FIELD_NAME);
    b.register(CTX_FILTER, &FUNCTION);

    b.register(CTX_FUNCTION, &FUNCTION_NAME);
    b.register(CTX_FUNCTION, &FUNCTION);
    b.register(CTX_FUNCTION, &ARGUMENT_REFERENCE);
    b.register(CTX_FUNCTION, &ARGUMENT_STATIC);
    b.register(CTX_ARGUMENT_STATIC, &ARGUMENT_TYPE);
    b.register(CTX_ARGUMENT_STATIC, &ARGUMENT_VALUE);

    b.register(CTX_RECOLLECTION_RESPONSE, &MESSAGE_ID);
    b.register(CTX_RECOLLECTION_RESPONSE, &RECOLLECTION_RESULT);
    b.register(CTX_RECOLLECTION_RESPONSE, &RESULT_ERROR);
    b.register(CTX_RECOLLECTION_RESULT, &ENTRY_HEADER);
    b.register(CTX_RECOLLECTION_RESULT, &FIELD_LIST);
    b.register(CTX_RECOLLECTION_RESULT, &COMPUTED_LIST);
    b.register(CTX_COMPUTED_LIST, &FIELD);

    b.register(CTX_HEALING_REQUEST, &MESSAGE_ID);
    b.register(CTX_HEALING_REQUEST, &ENTRY);
    b.register(CTX_HEALING_RESPONSE, &MESSAGE_ID);
    b.register(CTX_HEALING_RESPONSE, &RESULT_SUCCESS);
    b.register(CTX_HEALING_RESPONSE, &RESULT_ERROR);

    b.register(CTX_SCHEMA_REQUEST, &MESSAGE_ID);
    b.register(CTX_SCHEMA_REQUEST, &TABLESPACE_NAME);
    b.register(CTX_SCHEMA_REQUEST, &TABLE_NAME);
    b.register(CTX_SCHEMA_RESPONSE, &MESSAGE_ID);
    b.register(CTX_SCHEMA_RESPONSE, &SCHEMA_FIELD);
    b.register(CTX_SCHEMA_FIELD, &FIELD_NAME);
    b.register(CTX_SCHEMA_FIELD, &FIELD_TYPE);

    b.register(CTX_BILLING_REQUEST, &MESSAGE_ID);
    b.register(CTX_BILLING_REQUEST, &CHEQUE_LIST);
    b.register(CTX_BILLING_RESPONSE, &MESSAGE_ID);
    b.register(CTX_BILLING_RESPONSE, &RESULT_SUCCESS);
    b.register(CTX_BILLING_RESPONSE, &RESULT_ERROR);

    b.register(CTX_ERROR, &ERROR_CODE);
    b.register(CTX_ERROR, &ERROR_MESSAGE);

    b.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tag::TagCode;

    #[test]
    fn registry_builds() {
        let registry = registry();
        let code = TagCode::from_numeric(0x1E54_4945);
        assert_eq!(
            registry.resolve(CTX_ROOT, &code),
            Some(&MODIFICATION_REQUEST)
        );
    }

    #[test]
    fn context_scoping_disambiguates_shared_codes() {
        let registry = registry();
        let code = TagCode::from_numeric(0xD1);
        assert_eq!(registry.resolve(CTX_ENTRY, &code), Some(&FIELD_LIST));
        assert_eq!(registry.resolve(CTX_FIELD_LIST, &code), Some(&FIELD));
        assert_eq!(registry.resolve(CTX_ROOT, &code), None);
    }

    #[test]
    fn signed_scope_reaches_header_and_cheque() {
        let registry = registry();
        let code = TagCode::from_numeric(0xFE);
        assert_eq!(registry.resolve(CTX_ENTRY_HEADER, &code), Some(&SIGNATURE));
        assert_eq!(registry.resolve(CTX_CHEQUE, &code), Some(&SIGNATURE));
    }

    #[test]
    fn structural_convention_holds_for_all_containers() {
        for def in [
            &MODIFICATION_REQUEST,
            &ENTRY,
            &ENTRY_HEADER,
            &FIELD_LIST,
            &FIELD,
            &CHEQUE_LIST,
            &CHEQUE,
            &ADDRESS_LIST,
            &RESULT_SUCCESS,
            &RESULT_ERROR,
            &RETRIEVE_LIST,
            &RETRIEVE_COMPUTE,
            &FILTER_LIST,
            &FILTER,
            &FUNCTION,
            &ARGUMENT_STATIC,
            &RECOLLECTION_RESULT,
            &COMPUTED_LIST,
            &SCHEMA_FIELD,
            &ERROR,
        ] {
            assert!(
                def.code.is_structural_hint(),
                "{} violates the low-bit convention",
                def.name
            );
        }
        for def in [&SIGNER, &SIGNATURE, &CONSISTENCY, &MESSAGE_ID, &ADDRESS, &ERROR_MESSAGE] {
            assert!(
                !def.code.is_structural_hint(),
                "{} violates the low-bit convention",
                def.name
            );
        }
    }
}
