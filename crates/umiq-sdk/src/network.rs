use serde::{Deserialize, Serialize};

/// Networks the client knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    SomniaTestnet,
    Localhost,
}

impl Network {
    pub fn chain_id(self) -> u64 {
        match self {
            Network::SomniaTestnet => 50312,
            Network::Localhost => 31337,
        }
    }

    pub fn default_rpc_url(self) -> &'static str {
        match self {
            Network::SomniaTestnet => "https://dream-rpc.somnia.network/",
            Network::Localhost => "http://127.0.0.1:8545",
        }
    }

    /// Address of the deployed market contract.
    pub fn default_contract_address(self) -> &'static str {
        match self {
            Network::SomniaTestnet => "0xc0b33Cc720025dD0AcF56e249C8b76A6A34170B6",
            // First deployment address of a fresh hardhat node.
            Network::Localhost => "0x5FbDB2315678afecb367f032d93F642f64180aa3",
        }
    }

    pub fn explorer_tx_base(self) -> Option<&'static str> {
        match self {
            Network::SomniaTestnet => Some("https://shannon-explorer.somnia.network/tx/"),
            Network::Localhost => None,
        }
    }

    pub fn explorer_tx_url(self, tx_hash: &str) -> Option<String> {
        self.explorer_tx_base().map(|base| format!("{base}{tx_hash}"))
    }

    pub fn native_symbol(self) -> &'static str {
        match self {
            Network::SomniaTestnet => "STT",
            Network::Localhost => "ETH",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Network::SomniaTestnet => "somnia-testnet",
            Network::Localhost => "localhost",
        }
    }
}

impl std::str::FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "somnia-testnet" | "somnia" | "testnet" => Ok(Network::SomniaTestnet),
            "localhost" | "local" | "hardhat" => Ok(Network::Localhost),
            _ => Err(format!("invalid network: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_aliases() {
        assert_eq!("somnia".parse::<Network>().unwrap(), Network::SomniaTestnet);
        assert_eq!("Somnia-Testnet".parse::<Network>().unwrap(), Network::SomniaTestnet);
        assert_eq!("hardhat".parse::<Network>().unwrap(), Network::Localhost);
        assert!("mainnet".parse::<Network>().is_err());
    }

    #[test]
    fn as_str_parses_back() {
        for network in [Network::SomniaTestnet, Network::Localhost] {
            assert_eq!(network.as_str().parse::<Network>().unwrap(), network);
        }
    }

    #[test]
    fn explorer_url_only_on_testnet() {
        assert_eq!(
            Network::SomniaTestnet.explorer_tx_url("0xabc").as_deref(),
            Some("https://shannon-explorer.somnia.network/tx/0xabc")
        );
        assert!(Network::Localhost.explorer_tx_url("0xabc").is_none());
    }
}
