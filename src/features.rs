//! Feature registry
//!
//! Canonical column roles of the ticketing transaction table produced upstream:
//! tracking columns (identifiers and timestamps, never model input), the target
//! column, and the categorical and numeric model features. The column names are the
//! only contract between this crate and the feature-engineering step.

use crate::error::{FraudError, Result};
use ndarray::Array1;
use polars::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Identifier and timestamp columns
pub const TRACKING_COLUMNS: &[&str] = &[
    "id_transacao",
    "id_cartao",
    "ts_transacao",
    "data_transacao",
];

/// Binary fraud label
pub const TARGET_COLUMN: &str = "target_fraude";

pub const CATEGORICAL_FEATURES: &[&str] = &[
    "temp_faixa",
    "valor_transacao_faixa",
    "periodo_dia",
];

pub const NUMERIC_FEATURES: &[&str] = &[
    "hora_transacao",
    "dia_semana",
    "fim_de_semana",
    "tempo_vida_cartao_dias",
    "tempo_desde_ultima_transacao_min",
    "tempo_desde_ultima_transacao_horas",
    "uso_intervalo_curto",
    "qtd_transacoes_dia",
    "qtd_transacoes_24h",
    "uso_intenso_24h",
    "linha_repetida",
    "dispositivo_repetido",
    "qtd_linhas_distintas_dia",
    "qtd_dispositivos_distintos_dia",
    "idade_suspeita",
    "feriado_bin",
    "feriado_nao_mapeado",
    "sentido_ida",
    "clima_adverso",
    "cartao_qtd_transacoes",
    "cartao_dias_ativos",
    "cartao_media_transacoes_por_dia",
    "cartao_qtd_linhas_distintas",
    "cartao_qtd_dispositivos_distintos",
    "cartao_qtd_motoristas_distintos",
    "cartao_valor_transacao_mean",
    "cartao_valor_transacao_std",
    "cartao_pct_integracao",
    "cartao_pct_feriado",
    "cartao_pct_intervalo_curto",
    "valor_vs_media_cartao",
    "valor_zscore_cartao",
    "valor_outlier_cartao",
    "uso_acima_media_dia_cartao",
];

/// The official grouping of columns by role
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureRoles {
    pub tracking: &'static [&'static str],
    pub target: &'static str,
    pub categorical: &'static [&'static str],
    pub numeric: &'static [&'static str],
}

impl FeatureRoles {
    /// Role name -> columns, keyed the way the modelling notebooks refer to them
    pub fn as_map(&self) -> BTreeMap<&'static str, Vec<&'static str>> {
        let mut map = BTreeMap::new();
        map.insert("rastreio", self.tracking.to_vec());
        map.insert("alvo", vec![self.target]);
        map.insert("categoricas", self.categorical.to_vec());
        map.insert("numericas", self.numeric.to_vec());
        map
    }
}

/// Return the column roles
pub fn get_features() -> FeatureRoles {
    FeatureRoles {
        tracking: TRACKING_COLUMNS,
        target: TARGET_COLUMN,
        categorical: CATEGORICAL_FEATURES,
        numeric: NUMERIC_FEATURES,
    }
}

/// Full list of model features: categorical first, then numeric.
///
/// This is the canonical column order for every downstream consumer.
pub fn get_feature_names() -> Vec<String> {
    CATEGORICAL_FEATURES
        .iter()
        .chain(NUMERIC_FEATURES.iter())
        .map(|s| s.to_string())
        .collect()
}

/// Check that `columns` contains every model feature.
///
/// Extra columns are accepted; consumers select the features they know.
pub fn validate_feature_set<I, S>(columns: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let received: BTreeSet<String> = columns
        .into_iter()
        .map(|c| c.as_ref().to_string())
        .collect();

    // BTreeSet iteration keeps the report sorted
    let missing: Vec<String> = get_feature_names()
        .into_iter()
        .collect::<BTreeSet<_>>()
        .difference(&received)
        .cloned()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(FraudError::MissingFeatures { missing })
    }
}

/// [`validate_feature_set`] over the column names of a frame
pub fn validate_frame(df: &DataFrame) -> Result<()> {
    validate_feature_set(df.get_column_names().into_iter().map(|name| name.as_str()))
}

/// Select the model features in canonical order, dropping tracking, target and
/// unknown columns.
pub fn feature_frame(df: &DataFrame) -> Result<DataFrame> {
    validate_frame(df)?;
    Ok(df.select(get_feature_names())?)
}

/// Extract the fraud label as 0/1 floats
pub fn target_from_frame(df: &DataFrame) -> Result<Array1<f64>> {
    let column = df
        .column(TARGET_COLUMN)
        .map_err(|_| FraudError::FeatureNotFound(TARGET_COLUMN.to_string()))?;
    let as_f64 = column.cast(&DataType::Float64)?;

    as_f64
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value.ok_or_else(|| {
                FraudError::DataError(format!("{} is null at row {}", TARGET_COLUMN, row))
            })
        })
        .collect::<Result<Vec<f64>>>()
        .map(Array1::from_vec)
}
