//! Static definitions for the Easee charger observation stream.
//!
//! One entry per known numbered telemetry field, as documented by the vendor.
//! The table is pure data; the human-readable labels for enum-typed fields
//! live in the [`enum_label`] registry next to it so that no executable code
//! is embedded in the definitions themselves.
//!
//! Table order is significant for name-based lookups: earlier entries win
//! ties.

use serde_json::Value;

/// Wire type of an observation value as sent by the cloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Binary,
    Boolean,
    Double,
    Integer,
    Position,
    String,
    Statistics,
    Json,
}

/// One known telemetry field.
#[derive(Debug, Clone, Copy)]
pub struct ObservationDefinition {
    pub id: u32,
    pub name: &'static str,
    /// Older name kept for compatibility with flows that matched on it.
    pub alternate_name: Option<&'static str>,
    pub data_type: DataType,
    pub unit: Option<&'static str>,
}

const fn obs(id: u32, name: &'static str, data_type: DataType) -> ObservationDefinition {
    ObservationDefinition {
        id,
        name,
        alternate_name: None,
        data_type,
        unit: None,
    }
}

const fn obs_unit(
    id: u32,
    name: &'static str,
    data_type: DataType,
    unit: &'static str,
) -> ObservationDefinition {
    ObservationDefinition {
        id,
        name,
        alternate_name: None,
        data_type,
        unit: Some(unit),
    }
}

const fn obs_alt(
    id: u32,
    name: &'static str,
    alternate_name: &'static str,
    data_type: DataType,
) -> ObservationDefinition {
    ObservationDefinition {
        id,
        name,
        alternate_name: Some(alternate_name),
        data_type,
        unit: None,
    }
}

/// Every observation id the decoder knows about. Unknown ids still decode,
/// just without type, unit or label annotations.
pub static OBSERVATIONS: &[ObservationDefinition] = &[
    obs(1, "SelfTestResult", DataType::String),
    obs(2, "SelfTestDetails", DataType::Json),
    obs(3, "WifiEvent", DataType::Integer),
    obs(4, "ChargerOfflineReason", DataType::Integer),
    obs(5, "EaseeLinkCommandResponse", DataType::Integer),
    obs(6, "EaseeLinkDataReceived", DataType::String),
    obs(7, "LocalPreAuthorizeEnabled", DataType::Boolean),
    obs(8, "LocalAuthorizeOfflineEnabled", DataType::Boolean),
    obs(9, "AllowOfflineTxForUnknownId", DataType::Boolean),
    obs(10, "ErraticEVMaxToggles", DataType::Integer),
    obs(11, "BackplateType", DataType::Integer),
    obs(12, "SiteStructure", DataType::String),
    obs(13, "DetectedPowerGridType", DataType::Integer),
    obs_unit(14, "CircuitMaxCurrentP1", DataType::Double, "A"),
    obs_unit(15, "CircuitMaxCurrentP2", DataType::Double, "A"),
    obs_unit(16, "CircuitMaxCurrentP3", DataType::Double, "A"),
    obs(17, "Location", DataType::Position),
    obs(18, "SiteIDString", DataType::String),
    obs(19, "SiteIDNumeric", DataType::Integer),
    obs(20, "LockCablePermanently", DataType::Boolean),
    obs(21, "IsEnabled", DataType::Boolean),
    obs(22, "CircuitSequenceNumber", DataType::Integer),
    obs(23, "SinglePhaseNumber", DataType::Integer),
    obs_alt(24, "Enable3Phases_DEPRECATED", "Enable3Phases", DataType::Boolean),
    obs(25, "WiFiSSID", DataType::String),
    obs(26, "EnableIdleCurrent", DataType::Boolean),
    obs(27, "PhaseMode", DataType::Integer),
    obs(28, "ForcedThreePhaseOnITWithGndFault", DataType::Boolean),
    obs_unit(29, "LedStripBrightness", DataType::Integer, "%"),
    obs(30, "LocalAuthorizationRequired", DataType::Boolean),
    obs(31, "AuthorizationRequired", DataType::Boolean),
    obs(32, "RemoteStartRequired", DataType::Boolean),
    obs(33, "SmartButtonEnabled", DataType::Boolean),
    obs(34, "OfflineChargingMode", DataType::Integer),
    obs(35, "LEDMode", DataType::Integer),
    obs_unit(36, "MaxChargerCurrent", DataType::Double, "A"),
    obs_unit(37, "DynamicChargerCurrent", DataType::Double, "A"),
    obs_unit(38, "MaxCurrentOfflineFallback_P1", DataType::Integer, "A"),
    obs_unit(39, "MaxCurrentOfflineFallback_P2", DataType::Integer, "A"),
    obs_unit(40, "MaxCurrentOfflineFallback_P3", DataType::Integer, "A"),
    obs(41, "ListenToControlPulse", DataType::Boolean),
    obs_unit(42, "ControlPulseRTT", DataType::Integer, "ms"),
    obs_unit(48, "DynamicCircuitCurrentP1", DataType::Double, "A"),
    obs_unit(49, "DynamicCircuitCurrentP2", DataType::Double, "A"),
    obs_unit(50, "DynamicCircuitCurrentP3", DataType::Double, "A"),
    obs_unit(51, "OfflineMaxCircuitCurrentP1", DataType::Integer, "A"),
    obs_unit(52, "OfflineMaxCircuitCurrentP2", DataType::Integer, "A"),
    obs_unit(53, "OfflineMaxCircuitCurrentP3", DataType::Integer, "A"),
    obs(62, "ChargingSchedule", DataType::Json),
    obs(68, "WiFiAPEnabled", DataType::Boolean),
    obs(69, "PairedUserIDToken", DataType::String),
    obs_unit(70, "CircuitTotalAllocatedPhaseConductorCurrentL1", DataType::Double, "A"),
    obs_unit(71, "CircuitTotalAllocatedPhaseConductorCurrentL2", DataType::Double, "A"),
    obs_unit(72, "CircuitTotalAllocatedPhaseConductorCurrentL3", DataType::Double, "A"),
    obs_unit(73, "CircuitTotalPhaseConductorCurrentL1", DataType::Double, "A"),
    obs_unit(74, "CircuitTotalPhaseConductorCurrentL2", DataType::Double, "A"),
    obs_unit(75, "CircuitTotalPhaseConductorCurrentL3", DataType::Double, "A"),
    obs(76, "NumberOfCarsConnected", DataType::Integer),
    obs(77, "NumberOfCarsCharging", DataType::Integer),
    obs(78, "NumberOfCarsInQueue", DataType::Integer),
    obs(79, "NumberOfCarsFullyCharged", DataType::Integer),
    obs(80, "SoftwareRelease", DataType::Integer),
    obs(81, "ICCID", DataType::String),
    obs(82, "ModemFwId", DataType::String),
    obs(83, "OTAErrorCode", DataType::Integer),
    obs(86, "MobileNetworkOperator", DataType::String),
    obs(89, "RebootReason", DataType::Integer),
    obs(90, "PowerPCBVersion", DataType::Integer),
    obs(91, "ComPCBVersion", DataType::Integer),
    obs(96, "ReasonForNoCurrent", DataType::Integer),
    obs(97, "LoadBalancingNumberOfConnectedChargers", DataType::Integer),
    obs(98, "UDPNumOfConnectedNodes", DataType::Integer),
    obs(100, "PilotMode", DataType::String),
    obs_alt(101, "CarConnected_DEPRECATED", "CarConnected", DataType::Boolean),
    obs(102, "SmartCharging", DataType::Boolean),
    obs(103, "CableLocked", DataType::Boolean),
    obs_unit(104, "CableRating", DataType::Double, "A"),
    obs_unit(105, "PilotHigh", DataType::Double, "V"),
    obs_unit(106, "PilotLow", DataType::Double, "V"),
    obs(107, "BackPlateID", DataType::String),
    obs(108, "UserIDTokenReversed", DataType::String),
    obs(109, "ChargerOpMode", DataType::Integer),
    obs(110, "OutputPhase", DataType::Integer),
    obs(111, "DynamicOutputPhase", DataType::Integer),
    obs_unit(112, "DeratedCurrent", DataType::Double, "A"),
    obs(113, "IsDerated", DataType::Boolean),
    obs_unit(114, "TempMax", DataType::Double, "C"),
    obs_unit(115, "TempAmbient", DataType::Double, "C"),
    obs_unit(120, "TotalPower", DataType::Double, "W"),
    obs_unit(121, "SessionEnergy", DataType::Double, "kWh"),
    obs_unit(122, "EnergyPerHour", DataType::Double, "kWh"),
    obs_alt(123, "LegacyEvStatus", "EVStatus", DataType::Integer),
    obs_unit(124, "LifetimeEnergy", DataType::Double, "kWh"),
    obs(125, "OfflineMaxCircuitCurrentP1_DEPRECATED", DataType::Integer),
    obs(145, "SessionEnergyCountActive", DataType::Integer),
    obs(146, "SessionEnergyCountReactive", DataType::Integer),
    obs(147, "ActivePowerImport", DataType::Double),
    obs(148, "ActivePowerExport", DataType::Double),
    obs_unit(150, "TempMaxLimit", DataType::Double, "C"),
    obs_unit(151, "TempInternal5", DataType::Double, "C"),
    obs_unit(152, "TempInternal6", DataType::Double, "C"),
    obs_unit(182, "InCurrent_T2", DataType::Double, "A"),
    obs_unit(183, "InCurrent_T3", DataType::Double, "A"),
    obs_unit(184, "InCurrent_T4", DataType::Double, "A"),
    obs_unit(185, "InCurrent_T5", DataType::Double, "A"),
    obs_unit(190, "InVolt_T1_T2", DataType::Double, "V"),
    obs_unit(191, "InVolt_T1_T3", DataType::Double, "V"),
    obs_unit(192, "InVolt_T1_T4", DataType::Double, "V"),
    obs_unit(193, "InVolt_T1_T5", DataType::Double, "V"),
    obs_unit(194, "InVolt_T2_T3", DataType::Double, "V"),
    obs_unit(195, "InVolt_T2_T4", DataType::Double, "V"),
    obs_unit(196, "InVolt_T2_T5", DataType::Double, "V"),
    obs_unit(197, "InVolt_T3_T4", DataType::Double, "V"),
    obs_unit(198, "InVolt_T3_T5", DataType::Double, "V"),
    obs_unit(199, "InVolt_T4_T5", DataType::Double, "V"),
    obs_unit(202, "OutVolt_T2_T3", DataType::Double, "V"),
    obs_unit(203, "OutVolt_T2_T4", DataType::Double, "V"),
    obs_unit(204, "OutVolt_T2_T5", DataType::Double, "V"),
    obs_unit(205, "OutVolt_T3_T4", DataType::Double, "V"),
    obs_unit(206, "OutVolt_T3_T5", DataType::Double, "V"),
    obs_unit(207, "OutVolt_T4_T5", DataType::Double, "V"),
    obs_unit(210, "OutCurrent_T2", DataType::Double, "A"),
    obs_unit(211, "OutCurrent_T3", DataType::Double, "A"),
    obs_unit(212, "OutCurrent_T4", DataType::Double, "A"),
    obs_unit(213, "OutCurrent_T5", DataType::Double, "A"),
    obs(230, "EqAvailableCurrentP1", DataType::Double),
    obs(231, "EqAvailableCurrentP2", DataType::Double),
    obs(232, "EqAvailableCurrentP3", DataType::Double),
];

pub fn lookup_by_id(id: u32) -> Option<&'static ObservationDefinition> {
    OBSERVATIONS.iter().find(|def| def.id == id)
}

/// Human label for an enum-typed observation value, applied after coercion.
/// Values the registry does not know yield `None`, which callers treat as
/// "no label available", not as an error.
pub fn enum_label(id: u32, value: &Value) -> Option<&'static str> {
    match id {
        // PilotMode is string-keyed; everything else is integer-keyed.
        100 => match value.as_str()? {
            "A" => Some("Car disconnected"),
            "B" => Some("Car connected"),
            "C" => Some("Car charging"),
            "D" => Some("Car needs ventilation"),
            "F" => Some("Fault detected"),
            _ => None,
        },
        _ => integer_enum_label(id, value.as_i64()?),
    }
}

fn integer_enum_label(id: u32, value: i64) -> Option<&'static str> {
    match id {
        13 => match value {
            0 => Some("Not yet detected"),
            1 => Some("TN 3-phase"),
            2 => Some("TN 2-phase"),
            3 => Some("TN 1-phase"),
            4 => Some("IT 3-phase"),
            5 => Some("IT 1-phase"),
            _ => None,
        },
        27 => match value {
            1 => Some("Locked to single phase"),
            2 => Some("Auto"),
            3 => Some("Locked to three phase"),
            _ => None,
        },
        34 => match value {
            0 => Some("Always allow offline charging"),
            1 => Some("Only allow offline charging for authorized tokens"),
            2 => Some("Never allow offline charging"),
            _ => None,
        },
        96 => match value {
            0 => Some("Charger fine - charging or ready to charge"),
            1 => Some("Max circuit current too low"),
            2 => Some("Max dynamic circuit current too low"),
            3 => Some("Max dynamic offline fallback circuit current too low"),
            4 => Some("Circuit fuse too low"),
            5 => Some("Waiting in queue"),
            6 => Some("Waiting in fully charged queue"),
            7 => Some("Illegal grid type"),
            50 => Some("Secondary unit not requesting current"),
            51 => Some("Max charger current too low"),
            52 => Some("Max dynamic charger current too low"),
            53 => Some("Charger disabled"),
            54 => Some("Pending scheduled charging"),
            55 => Some("Pending authorization"),
            56 => Some("Charger in error state"),
            57 => Some("Erratic EV"),
            100 => Some("Undefined error"),
            _ => None,
        },
        109 => match value {
            0 => Some("Offline"),
            1 => Some("Disconnected"),
            2 => Some("Awaiting Start"),
            3 => Some("Charging"),
            4 => Some("Completed"),
            5 => Some("Error"),
            6 => Some("Ready To Charge"),
            _ => None,
        },
        110 => match value {
            0 => Some("Unassigned"),
            10 => Some("1-phase (N + L1)"),
            11 => Some("1-phase (L1 + L2)"),
            12 => Some("1-phase (N + L2)"),
            13 => Some("1-phase (L1 + L3)"),
            14 => Some("1-phase (N + L3)"),
            15 => Some("1-phase (L2 + L3)"),
            20 => Some("2-phase (N + L1 + L2)"),
            21 => Some("2-phase (L1 + L2 + L3)"),
            30 => Some("3-phase (N + L1 + L2 + L3)"),
            _ => None,
        },
        123 => match value {
            0 => Some("Disconnected"),
            1 => Some("Connected"),
            2 => Some("Charging"),
            _ => None,
        },
        _ => None,
    }
}
