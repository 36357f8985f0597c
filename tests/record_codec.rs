use bytes::Bytes;
use l2server::catalog;
use l2server::codec::{
    CodecErrorKind, DiagnosticKind, PresenceMask, Record, UnionValue, Value, decode_record,
    encode_record,
};

fn list(items: impl IntoIterator<Item = impl Into<Value>>) -> Value {
    Value::List(items.into_iter().map(Into::into).collect())
}

fn ctrl_res_set() -> Record {
    Record::new()
        .with("CtrlResSetId", 1u8)
        .with("FreqDomRes", 0x3Fu64)
        .with("PdcchDmrsScramblingId", 0u16)
        .with("PdcchDmrsScramblingIdIsValid", 0u8)
        .with("RbOffsetR16", 0u8)
        .with("TciPresentDciR16", 0u8)
        .with("CoresetPoolIndexR16", 0u8)
        .with("TciStates", list([5u8, 6]))
}

#[test]
fn pdcch_config_layout_is_bit_exact() {
    let schema = catalog::pdcch_conf_ded().unwrap();
    let record = Record::new()
        .with("DedCtrlResSetsIdToDel", list([2u8]))
        .with(
            "TpcPucch",
            Record::new()
                .with("TpcIndexPCell", 3u8)
                .with("Pad", Bytes::from_static(&[0, 0])),
        )
        .with("DedCtrlResSetsToAdd", list([ctrl_res_set()]))
        .with("DedSearchSpacesIdToDel", list([7u32, 9]));

    let bytes = encode_record(&schema, &record).unwrap();
    assert_eq!(bytes.len(), 108);

    // mask, four counts, fixed-capacity delete array
    assert_eq!(&bytes[..8], &[0x04, 1, 1, 0, 2, 2, 0, 0]);
    // TpcPucch with an absent SCell index
    assert_eq!(&bytes[8..12], &[3, 0xFF, 0, 0]);
    // CtrlResSet: id, five absent u8 fields, absent ShiftIndex, FreqDomRes
    assert_eq!(&bytes[12..20], &[1, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
    assert_eq!(&bytes[20..28], &0x3Fu64.to_le_bytes());
    // NbTciStates is derived from the TCI list
    assert_eq!(bytes[32], 2);
    // TciStates padded to 64 slots
    assert_eq!(&bytes[36..38], &[5, 6]);
    assert!(bytes[38..100].iter().all(|&b| b == 0));
    assert_eq!(&bytes[100..], &[7, 0, 0, 0, 9, 0, 0, 0]);

    let decoded = decode_record(&schema, &bytes).unwrap();
    assert!(decoded.is_clean());
    let out = &decoded.record;
    assert_eq!(
        out.get("FieldMask"),
        Some(&Value::Mask(PresenceMask::from_bits(0x04)))
    );
    assert_eq!(out.get("DownlinkPreemption"), Some(&Value::Absent));
    assert_eq!(out.get("DedCtrlResSetsIdToDel"), Some(&list([2u8])));
    assert_eq!(
        out.get_record("TpcPucch").unwrap().get("TpcIndexSCell"),
        Some(&Value::Absent)
    );

    let coresets = out.get("DedCtrlResSetsToAdd").unwrap().as_list().unwrap();
    let coreset = coresets[0].as_record().unwrap();
    assert_eq!(coreset.get_u64("NbTciStates"), Some(2));
    assert_eq!(coreset.get("TciStates"), Some(&list([5u8, 6])));
    assert_eq!(coreset.get("ShiftIndex"), Some(&Value::Absent));

    assert_eq!(encode_record(&schema, out).unwrap(), bytes);
}

#[test]
fn qcl_info_unknown_reference_signal_is_preserved() {
    let schema = catalog::qcl_info().unwrap();
    let wire = [0x01, 0x00, 0xFF, 0x00, 0x07, 0xAA, 0x00, 0x00];

    let decoded = decode_record(&schema, &wire).unwrap();
    assert_eq!(decoded.diagnostics.len(), 1);
    assert_eq!(decoded.diagnostics[0].path.to_string(), "QclInfo.RefSig");
    assert_eq!(
        decoded.diagnostics[0].kind,
        DiagnosticKind::UnknownSelector { selector: 7 }
    );
    assert_eq!(
        decoded.record.get("RefSig"),
        Some(&Value::Union(UnionValue::Unknown {
            selector: 7,
            raw: Bytes::from_static(&[0xAA]),
        }))
    );
    assert_eq!(decoded.record.get("BwpId"), Some(&Value::Absent));

    assert_eq!(encode_record(&schema, &decoded.record).unwrap()[..], wire);
}

#[test]
fn qcl_info_variant_and_absent() {
    let schema = catalog::qcl_info().unwrap();
    let ssb = Record::new()
        .with("ServCellIdx", 1u16)
        .with("QclType", 0u8)
        .with(
            "RefSig",
            UnionValue::Variant {
                tag: catalog::ref_sig::SSB,
                record: Record::new().with("Ssb", 4u8),
            },
        )
        .with("Pad", Bytes::from_static(&[0, 0]));
    assert_eq!(
        encode_record(&schema, &ssb).unwrap()[..],
        [0x01, 0x00, 0xFF, 0x00, 0x01, 0x04, 0x00, 0x00]
    );

    let none = ssb.with("RefSig", UnionValue::Absent);
    let bytes = encode_record(&schema, &none).unwrap();
    assert_eq!(bytes[4..6], [0xFF, 0x00]);
    let decoded = decode_record(&schema, &bytes).unwrap();
    assert_eq!(
        decoded.record.get("RefSig"),
        Some(&Value::Union(UnionValue::Absent))
    );
}

#[test]
fn tdd_dedicated_lists_are_exact_length() {
    let schema = catalog::tdd_ul_dl_config_ded().unwrap();
    let slot = |index: u16| {
        Record::new()
            .with("SlotIndex", index)
            .with("Symbols", 1u8)
            .with("Spare", Bytes::from_static(&[0, 0, 0]))
    };
    let record = Record::new()
        .with("SlotSpecCfgAddMod", list([slot(3), slot(4)]))
        .with("SlotSpecCfgDel", list([8u32]));

    let bytes = encode_record(&schema, &record).unwrap();
    assert_eq!(bytes.len(), 4 + 2 * 8 + 4);
    assert_eq!(&bytes[..4], &[2, 0, 1, 0]);
    assert_eq!(&bytes[4..12], &[3, 0, 1, 0xFF, 0xFF, 0, 0, 0]);

    let decoded = decode_record(&schema, &bytes).unwrap();
    let slots = decoded.record.get("SlotSpecCfgAddMod").unwrap().as_list().unwrap();
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[1].as_record().unwrap().get_u64("SlotIndex"), Some(4));
}

#[test]
fn truncated_list_reports_path_and_offset() {
    let schema = catalog::tdd_ul_dl_config_ded().unwrap();
    let wire = [2, 0, 0, 0, 3, 0, 1, 0xFF, 0xFF, 0, 0, 0];

    let err = decode_record(&schema, &wire).unwrap_err();
    assert_eq!(err.path().to_string(), "TddUlDlConfigDed.SlotSpecCfgAddMod");
    assert_eq!(err.offset(), 4);
    assert_eq!(
        err.kind(),
        &CodecErrorKind::TruncatedInput {
            needed: 16,
            available: 8,
        }
    );
}

#[test]
fn list_beyond_capacity_is_refused() {
    let schema = catalog::pdcch_conf_ded().unwrap();
    let record = Record::new().with("DedCtrlResSetsIdToDel", list([1u8, 2, 3, 4]));

    let err = encode_record(&schema, &record).unwrap_err();
    assert_eq!(err.kind(), &CodecErrorKind::CapacityExceeded { len: 4, max: 3 });
    assert_eq!(
        err.path().to_string(),
        "PdcchConfDed.DedCtrlResSetsIdToDel"
    );
}

#[test]
fn login_name_must_leave_room_for_nul() {
    let schema = catalog::login().unwrap();
    let long = "x".repeat(40);

    let err = encode_record(&schema, &Record::new().with("CliName", long)).unwrap_err();
    assert_eq!(err.kind(), &CodecErrorKind::StringTooLong { len: 40, max: 39 });

    let ok = encode_record(&schema, &Record::new().with("CliName", "x".repeat(39))).unwrap();
    assert_eq!(ok.len(), 40);
    assert_eq!(ok[39], 0);
}

#[test]
fn version_info_ack_decodes_strings() {
    let schema = catalog::version_info_ack().unwrap();
    let mut wire = vec![2u8];
    let mut package = b"5.12.0".to_vec();
    package.resize(60, 0);
    let mut amm = b"amm-3.1".to_vec();
    amm.resize(60, 0);
    wire.extend_from_slice(&package);
    wire.extend_from_slice(&amm);

    let decoded = decode_record(&schema, &wire).unwrap();
    assert_eq!(decoded.record.get_u64("PackageType"), Some(2));
    assert_eq!(decoded.record.get_str("PackageVersion"), Some("5.12.0"));
    assert_eq!(decoded.record.get_str("AmmVersion"), Some("amm-3.1"));
}
