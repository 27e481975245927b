//! Network market-share aggregation.
//!
//! Turns a grouped-by-network timeseries into the five-bucket
//! [`NetworkBreakdown`] used by the asset market-share cards.

use crate::domain::{AssetMarketShareData, DataPoint, NetworkBreakdown};
use serde::Deserialize;

/// Ethereum mainnet
pub const MAINNET_NETWORK_ID: i64 = 1;

/// Ethereum layer 2 networks counted in the `layer2` bucket.
pub const LAYER2_NETWORK_IDS: [i64; 10] = [
    2,  // Arbitrum One
    3,  // OP Mainnet
    16, // Base
    28, // zkSync Era
    36, // Polygon zkEVM
    40, // Scroll
    41, // Linea
    43, // Mantle
    47, // Blast
    53, // Starknet
];

/// Enterprise and permissioned chains left out of every total.
pub const EXCLUDED_NETWORK_IDS: [i64; 3] = [
    22, // Provenance
    55, // Canton Network
    58, // Kinexys
];

/// Which network ids land in which bucket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NetworkTaxonomy {
    #[serde(default = "default_mainnet_id")]
    pub mainnet_id: i64,
    #[serde(default = "default_layer2_ids")]
    pub layer2_ids: Vec<i64>,
    #[serde(default = "default_excluded_ids")]
    pub excluded_ids: Vec<i64>,
}

fn default_mainnet_id() -> i64 {
    MAINNET_NETWORK_ID
}

fn default_layer2_ids() -> Vec<i64> {
    LAYER2_NETWORK_IDS.to_vec()
}

fn default_excluded_ids() -> Vec<i64> {
    EXCLUDED_NETWORK_IDS.to_vec()
}

impl Default for NetworkTaxonomy {
    fn default() -> Self {
        Self {
            mainnet_id: default_mainnet_id(),
            layer2_ids: default_layer2_ids(),
            excluded_ids: default_excluded_ids(),
        }
    }
}

impl NetworkTaxonomy {
    pub fn is_excluded(&self, id: i64) -> bool {
        self.excluded_ids.contains(&id)
    }

    pub fn is_layer2(&self, id: i64) -> bool {
        self.layer2_ids.contains(&id)
    }

    /// Mainnet or one of its layer 2s.
    pub fn is_ethereum_ecosystem(&self, id: i64) -> bool {
        id == self.mainnet_id || self.is_layer2(id)
    }
}

/// One network's points from a grouped timeseries query.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkSeries {
    pub network_id: i64,
    pub name: String,
    pub points: Vec<DataPoint>,
}

/// Latest value of a network; a snapshot, not a sum over time.
fn latest_value(points: &[DataPoint]) -> f64 {
    points
        .iter()
        .max_by_key(|p| p.date)
        .map(|p| p.value)
        .unwrap_or(0.0)
}

/// Bucket per-network latest values into an [`AssetMarketShareData`].
///
/// Excluded networks are dropped before anything is summed, so they are not
/// part of `asset_value_sum_all` either. Networks that are neither mainnet
/// nor a listed layer 2 are ranked by latest value: the top two fill
/// `alt_network_2nd`/`alt_network_3rd`, the rest is summed. When the total
/// is zero every market share is `0.0`.
pub fn aggregate_market_share(groups: &[NetworkSeries], taxonomy: &NetworkTaxonomy) -> AssetMarketShareData {
    let latest: Vec<(i64, f64)> = groups
        .iter()
        .filter(|g| !taxonomy.is_excluded(g.network_id))
        .map(|g| (g.network_id, latest_value(&g.points)))
        .collect();

    let asset_value_sum_all: f64 = latest.iter().map(|(_, v)| v).sum();

    let mainnet: f64 = latest
        .iter()
        .filter(|(id, _)| *id == taxonomy.mainnet_id)
        .map(|(_, v)| v)
        .sum();
    let layer2: f64 = latest
        .iter()
        .filter(|(id, _)| taxonomy.is_layer2(*id))
        .map(|(_, v)| v)
        .sum();

    let mut alternatives: Vec<f64> = latest
        .iter()
        .filter(|(id, _)| !taxonomy.is_ethereum_ecosystem(*id))
        .map(|(_, v)| *v)
        .collect();
    alternatives.sort_by(|a, b| b.total_cmp(a));

    let asset_value = NetworkBreakdown {
        mainnet,
        layer2,
        alt_network_2nd: alternatives.first().copied().unwrap_or(0.0),
        alt_network_3rd: alternatives.get(1).copied().unwrap_or(0.0),
        alt_networks_rest: alternatives.iter().skip(2).sum(),
    };

    let market_share = if asset_value_sum_all > 0.0 {
        asset_value.map(|v| v / asset_value_sum_all)
    } else {
        NetworkBreakdown::default()
    };

    AssetMarketShareData {
        asset_value,
        market_share,
        asset_value_sum_all,
    }
}
