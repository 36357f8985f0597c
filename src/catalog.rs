//! Built-in command catalog
//!
//! A sample of the LTE and NR5G L2 server O&M commands, enough to cover every
//! field kind the codec supports. Applications with their own command set
//! build a [`SchemaRegistry`] directly; this one is a starting point.
//!
//! The O&M commands and the PDCCH, QCL and TDD information elements follow
//! the server's packed C structures byte for byte. `SearchSpace` keeps its
//! selector for `SearchSpaceType` two fields away from the payload, so both
//! selectors are plain scalars and both payloads are carried as raw regions.
//!
//! [`cell_config`] is an illustrative shape rather than the server's cell
//! configuration. It keeps the fixed head of `CELL_CONFIG`, leaves out the RA
//! information, carries a `SegCnt` counter the way the MAC `CONFIG_CMD` does,
//! and nests the information elements above in a reduced [`cell_cfg`] record
//! followed by opaque L1 data.

use std::sync::Arc;

use crate::protocol::{Sapi, TypeCode};
use crate::schema::{
    CommandSchema, ElementSpec, ListSpec, MaskWidth, RecordSchema, Result, ScalarKind,
    ScalarSpec, SchemaRegistry, Segmentation, UnionSpec,
};

/// LTE O&M: client login
pub const LOGIN: TypeCode = TypeCode::new(1);
/// LTE O&M: remove a UE
pub const DELETE_UE: TypeCode = TypeCode::new(15);
/// LTE O&M: server version query
pub const VERSION_INFO: TypeCode = TypeCode::new(30);
pub use crate::protocol::{ERROR_IND, REJECT_IND};

/// First NR5G O&M type code
pub const NR5G_BASE: u16 = 2048;
/// NR5G O&M: open a cell
pub const OPEN_CELL: TypeCode = TypeCode::new(NR5G_BASE + 3);
/// NR5G O&M: configure a cell (segmentable)
pub const CELL_CONFIG: TypeCode = TypeCode::new(NR5G_BASE + 7);
/// NR5G O&M: create a UE
pub const CREATE_UE: TypeCode = TypeCode::new(NR5G_BASE + 9);
/// NR5G O&M: load a radio condition profile
pub const RCP_LOAD: TypeCode = TypeCode::new(NR5G_BASE + 13);

/// QCL-Info `RefSigIsValid` selectors
pub mod ref_sig {
    /// CSI-RS resource
    pub const CSI_RS: u64 = 0;
    /// SSB index
    pub const SSB: u64 = 1;
    /// CSI-RS resource set for tracking
    pub const CSI_RS_FOR_TRACKING: u64 = 2;
    /// No reference signal
    pub const NONE: u64 = 0xFF;
}

/// PDCCH-Config `FieldMask` bits
pub mod pdcch_mask {
    /// `DownlinkPreemption` present
    pub const DOWNLINK_PREEMPTION: u8 = 0;
    /// `TpcPusch` present
    pub const TPC_PUSCH: u8 = 1;
    /// `TpcPucch` present
    pub const TPC_PUCCH: u8 = 2;
    /// `TpcSrs` present
    pub const TPC_SRS: u8 = 3;
}

/// Cell group `FieldMask` bits
pub mod cell_cfg_mask {
    /// `TddUlDlConfigDed` present
    pub const TDD_DED: u8 = 0;
    /// `PdcchConfDed` present
    pub const PDCCH_DED: u8 = 1;
    /// `QclInfo` present
    pub const QCL_INFO: u8 = 2;
}

fn u8_opt() -> ScalarSpec {
    ScalarSpec::u8().absent_all_ones()
}

fn u16_opt() -> ScalarSpec {
    ScalarSpec::u16().absent_all_ones()
}

/// Generic ACK body: UE, cell or radio-condition-group id
pub fn ack_body() -> Result<Arc<RecordSchema>> {
    RecordSchema::builder("Ack").u32("Id").build()
}

/// Generic NAK body: id plus server error code
pub fn nak_body() -> Result<Arc<RecordSchema>> {
    RecordSchema::builder("Nak").u32("Id").i16("Err").build()
}

/// `LOGIN` request
pub fn login() -> Result<Arc<RecordSchema>> {
    RecordSchema::builder("Login").asciiz("CliName", 40).build()
}

/// `VERSION_INFO` request
pub fn version_info() -> Result<Arc<RecordSchema>> {
    RecordSchema::builder("VersionInfo")
        .scalar("Spare", ScalarSpec::u16().absent_as(0))
        .build()
}

/// `VERSION_INFO` ACK body
pub fn version_info_ack() -> Result<Arc<RecordSchema>> {
    RecordSchema::builder("VersionInfoAck")
        .u8("PackageType")
        .asciiz("PackageVersion", 60)
        .asciiz("AmmVersion", 60)
        .build()
}

/// `CREATE_UE` request
pub fn create_ue() -> Result<Arc<RecordSchema>> {
    RecordSchema::builder("CreateUe")
        .u32("UeId")
        .u32("CellId")
        .u32("UeFlags")
        .scalar("StkInst", ScalarSpec::u32().absent_all_ones())
        .scalar("UdgStkInst", ScalarSpec::u32().absent_all_ones())
        .build()
}

/// `DELETE_UE` request
pub fn delete_ue() -> Result<Arc<RecordSchema>> {
    RecordSchema::builder("DeleteUe").u32("UeId").build()
}

/// `OPEN_CELL` request
pub fn open_cell() -> Result<Arc<RecordSchema>> {
    RecordSchema::builder("OpenCell")
        .u32("CellId")
        .u32("L1Verbosity")
        .u32("L1UlReport")
        .u32("EnableCapsTest")
        .build()
}

/// `RCP_LOAD` request
pub fn rcp_load() -> Result<Arc<RecordSchema>> {
    RecordSchema::builder("RcpLoad")
        .u32("RcGroup")
        .u32("CellId")
        .u32("DbeamId")
        .asciiz("Fname", 100)
        .build()
}

/// QCL-Info IE
pub fn qcl_info() -> Result<Arc<RecordSchema>> {
    let csi_rs = RecordSchema::builder("CsiRs").scalar("CsiRs", u8_opt()).build()?;
    let ssb = RecordSchema::builder("Ssb").scalar("Ssb", u8_opt()).build()?;
    let tracking = RecordSchema::builder("CsiRsForTracking")
        .scalar("CsiRsForTracking", u8_opt())
        .build()?;

    RecordSchema::builder("QclInfo")
        .scalar("ServCellIdx", u16_opt())
        .scalar("BwpId", u8_opt())
        .scalar("QclType", u8_opt())
        .union(
            "RefSig",
            UnionSpec::new(ScalarKind::U8, ref_sig::NONE)
                .variant(ref_sig::CSI_RS, "CsiRs", csi_rs)
                .variant(ref_sig::SSB, "Ssb", ssb)
                .variant(ref_sig::CSI_RS_FOR_TRACKING, "CsiRsForTracking", tracking),
        )
        .bytes("Pad", 2)
        .build()
}

/// TDD-UL-DL-ConfigDedicated IE
pub fn tdd_ul_dl_config_ded() -> Result<Arc<RecordSchema>> {
    let slot = RecordSchema::builder("SlotConfig")
        .u16("SlotIndex")
        .scalar("Symbols", u8_opt())
        .scalar("DownlinkSymbols", u8_opt())
        .scalar("UplinkSymbols", u8_opt())
        .bytes("Spare", 3)
        .build()?;

    RecordSchema::builder("TddUlDlConfigDed")
        .u16("NbSlotSpecCfgAddMod")
        .u16("NbSlotSpecCfgDel")
        .list(
            "SlotSpecCfgAddMod",
            ListSpec::counted_by("NbSlotSpecCfgAddMod", 320, ElementSpec::Record(slot)),
        )
        .list(
            "SlotSpecCfgDel",
            ListSpec::counted_by("NbSlotSpecCfgDel", 320, ElementSpec::Scalar(ScalarKind::U32)),
        )
        .build()
}

/// ControlResourceSet IE
pub fn ctrl_res_set() -> Result<Arc<RecordSchema>> {
    RecordSchema::builder("CtrlResSet")
        .scalar("CtrlResSetId", u8_opt())
        .scalar("CtrlResSetDuration", u8_opt())
        .scalar("PrecGranularity", u8_opt())
        .scalar("CceRegMapType", u8_opt())
        .scalar("RegBundleSize", u8_opt())
        .scalar("InterleaverSize", u8_opt())
        .scalar("ShiftIndex", u16_opt())
        .scalar("FreqDomRes", ScalarSpec::new(ScalarKind::U64))
        .u16("PdcchDmrsScramblingId")
        .u8("PdcchDmrsScramblingIdIsValid")
        .scalar("TciPresentInDci", u8_opt())
        .u8("NbTciStates")
        .u8("RbOffsetR16")
        .u8("TciPresentDciR16")
        .u8("CoresetPoolIndexR16")
        .list(
            "TciStates",
            ListSpec::counted_by("NbTciStates", 64, ElementSpec::Scalar(ScalarKind::U8))
                .fixed_capacity(),
        )
        .build()
}

/// SearchSpace IE
pub fn search_space() -> Result<Arc<RecordSchema>> {
    let candidates = RecordSchema::builder("NbCandidates")
        .scalar("AggLev1", u8_opt())
        .scalar("AggLev2", u8_opt())
        .scalar("AggLev4", u8_opt())
        .scalar("AggLev8", u8_opt())
        .scalar("AggLev16", u8_opt())
        .bytes("Spare", 3)
        .build()?;

    RecordSchema::builder("SearchSpace")
        .scalar("SearchSpaceId", u8_opt())
        .scalar("CtrlResSetId", u8_opt())
        .u16("MonitorSymbsInSlot")
        .scalar("MonitorSlotIsValid", u8_opt())
        .scalar("SearchSpaceTypeIsValid", u8_opt())
        .bytes("MonitorSlot", 2)
        .record("NbCandidates", candidates)
        .bytes("SearchSpaceType", 16)
        .scalar("SearchSpaceDuration", u16_opt())
        .bytes("Pad", 2)
        .build()
}

/// PDCCH-Config IE (dedicated)
pub fn pdcch_conf_ded() -> Result<Arc<RecordSchema>> {
    let serving_cell = RecordSchema::builder("IntConfPerServingCell")
        .u16("ServCellIdx")
        .scalar("PositionInDci", u8_opt())
        .u8("Pad")
        .build()?;
    let preemption = RecordSchema::builder("DownlinkPreemption")
        .scalar("TimeFrequencySet", u8_opt())
        .scalar("DciPayloadSize", u8_opt())
        .u8("NbIntConfPerServingCell")
        .u8("Pad")
        .u16("IntRnti")
        .list(
            "IntConfPerServingCell",
            ListSpec::counted_by("NbIntConfPerServingCell", 32, ElementSpec::Record(serving_cell)),
        )
        .build()?;
    let tpc_pusch = RecordSchema::builder("TpcPusch")
        .scalar("TpcIndex", u8_opt())
        .scalar("TpcIndexSul", u8_opt())
        .u16("ServCellIdx")
        .build()?;
    let tpc_pucch = RecordSchema::builder("TpcPucch")
        .scalar("TpcIndexPCell", u8_opt())
        .scalar("TpcIndexSCell", u8_opt())
        .bytes("Pad", 2)
        .build()?;
    let tpc_srs = RecordSchema::builder("TpcSrs")
        .scalar("StartingBitOfFormat23", u8_opt())
        .scalar("FieldTypeFormat23", u8_opt())
        .scalar("StartingBitOfFormat23Sul", u8_opt())
        .u8("Pad")
        .build()?;

    RecordSchema::builder("PdcchConfDed")
        .mask("FieldMask", MaskWidth::W8)
        .u8("NbDedCtrlResSetsToAdd")
        .u8("NbDedCtrlResSetsToDel")
        .u8("NbDedSearchSpacesToAdd")
        .u8("NbDedSearchSpacesToDel")
        .list(
            "DedCtrlResSetsIdToDel",
            ListSpec::counted_by("NbDedCtrlResSetsToDel", 3, ElementSpec::Scalar(ScalarKind::U8))
                .fixed_capacity(),
        )
        .optional(
            "DownlinkPreemption",
            "FieldMask",
            pdcch_mask::DOWNLINK_PREEMPTION,
            preemption,
        )
        .optional("TpcPusch", "FieldMask", pdcch_mask::TPC_PUSCH, tpc_pusch)
        .optional("TpcPucch", "FieldMask", pdcch_mask::TPC_PUCCH, tpc_pucch)
        .optional("TpcSrs", "FieldMask", pdcch_mask::TPC_SRS, tpc_srs)
        .list(
            "DedCtrlResSetsToAdd",
            ListSpec::counted_by("NbDedCtrlResSetsToAdd", 3, ElementSpec::Record(ctrl_res_set()?)),
        )
        .list(
            "DedSearchSpacesToAdd",
            ListSpec::counted_by(
                "NbDedSearchSpacesToAdd",
                10,
                ElementSpec::Record(search_space()?),
            ),
        )
        .list(
            "DedSearchSpacesIdToDel",
            ListSpec::counted_by("NbDedSearchSpacesToDel", 10, ElementSpec::Scalar(ScalarKind::U32)),
        )
        .build()
}

/// Reduced cell group configuration carried by [`cell_config`]
pub fn cell_cfg() -> Result<Arc<RecordSchema>> {
    RecordSchema::builder("CellCfg")
        .mask("FieldMask", MaskWidth::W32)
        .u32("ServCellIdx")
        .optional(
            "TddUlDlConfigDed",
            "FieldMask",
            cell_cfg_mask::TDD_DED,
            tdd_ul_dl_config_ded()?,
        )
        .optional(
            "PdcchConfDed",
            "FieldMask",
            cell_cfg_mask::PDCCH_DED,
            pdcch_conf_ded()?,
        )
        .optional("QclInfo", "FieldMask", cell_cfg_mask::QCL_INFO, qcl_info()?)
        .build()
}

/// `CELL_CONFIG` request (illustrative, segmentable)
///
/// `SegCnt` is filled in by the session when the request is segmented.
pub fn cell_config() -> Result<Arc<RecordSchema>> {
    RecordSchema::builder("CellConfig")
        .scalar("Spare", ScalarSpec::u32().absent_all_ones())
        .u32("CellId")
        .scalar("Ta", u8_opt())
        .u8("RaInfoValid")
        .u8("RachProbeReq")
        .u8("SegCnt")
        .record("CellCfg", cell_cfg()?)
        .list(
            "L1Data",
            ListSpec::counted(ScalarKind::U32, 64 * 1024, ElementSpec::Octet),
        )
        .build()
}

/// Registry holding every command of this catalog
pub fn default_registry() -> Result<SchemaRegistry> {
    let ack = ack_body()?;
    let mut registry = SchemaRegistry::new();

    registry.register(CommandSchema::new("LOGIN", Sapi::OM, LOGIN, login()?))?;
    registry.register(
        CommandSchema::new("VERSION_INFO", Sapi::OM, VERSION_INFO, version_info()?)
            .with_ack(version_info_ack()?),
    )?;
    registry.register(
        CommandSchema::new("DELETE_UE", Sapi::OM, DELETE_UE, delete_ue()?).with_ack(ack.clone()),
    )?;
    registry.register(
        CommandSchema::new("CREATE_UE", Sapi::OM, CREATE_UE, create_ue()?).with_ack(ack.clone()),
    )?;
    registry.register(
        CommandSchema::new("OPEN_CELL", Sapi::OM, OPEN_CELL, open_cell()?).with_ack(ack.clone()),
    )?;
    registry.register(
        CommandSchema::new("RCP_LOAD", Sapi::OM, RCP_LOAD, rcp_load()?).with_ack(ack.clone()),
    )?;
    registry.register(
        CommandSchema::new("CELL_CONFIG", Sapi::OM, CELL_CONFIG, cell_config()?)
            .with_ack(ack)
            .segmentable(Segmentation::new("SegCnt", "CellId")),
    )?;

    Ok(registry)
}
