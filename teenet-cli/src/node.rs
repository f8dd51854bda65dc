//! `node` commands over the node registry.

use std::path::Path;

use anyhow::anyhow;
use teenet_registry::LocalWallet;
use teenet_registry::NodeRegistry;
use teenet_types::hex32;
use teenet_types::parse_bytes32;
use teenet_types::Node;
use teenet_types::NodeFile;
use teenet_types::NodePk;

use crate::output::Output;
use crate::task::read_json;

fn parse_pk(pk: &str) -> anyhow::Result<NodePk> {
    parse_bytes32(pk).ok_or_else(|| anyhow!("Invalid tee public key\npk={pk}"))
}

fn print_node(
    out: &dyn Output,
    node: &Node,
) {
    out.log(&format!(
        "Public key: {}\nOwned by: {:?}\nTEE type: {}\nTEE version: {}\nAttestation: {}",
        hex32(&node.pk),
        node.owner,
        node.tee_type,
        node.tee_ver,
        node.attestation
    ));
}

/// `node get`
pub async fn get<R: NodeRegistry + ?Sized>(
    registry: &R,
    out: &dyn Output,
    pk: &str,
) -> anyhow::Result<Node> {
    let pk = parse_pk(pk)?;
    let node = registry
        .get_node(pk)
        .await?
        .ok_or_else(|| anyhow!("Node pk={} does not exist", hex32(&pk)))?;
    out.log("Node info:");
    print_node(out, &node);
    Ok(node)
}

/// `node add-or-update`
pub async fn add_or_update<R: NodeRegistry + ?Sized>(
    registry: &R,
    out: &dyn Output,
    signer: &LocalWallet,
    file: &Path,
) -> anyhow::Result<()> {
    let node: NodeFile = read_json(file)?;
    registry
        .add_or_update(signer, &node)
        .await?;
    out.log("Added/updated node info:");
    print_node(out, &node);
    Ok(())
}

/// `node remove`
pub async fn remove<R: NodeRegistry + ?Sized>(
    registry: &R,
    out: &dyn Output,
    signer: &LocalWallet,
    pk: &str,
) -> anyhow::Result<()> {
    let pk = parse_pk(pk)?;
    registry
        .remove(signer, pk)
        .await?;
    out.log(&format!("Removed node info with pk={}", hex32(&pk)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use ethers::types::Address;
    use ethers::types::H256;
    use teenet_registry::RegistryError;

    use super::*;
    use crate::output::Recorder;

    #[derive(Default)]
    struct Nodes(Mutex<Vec<Node>>);

    #[async_trait]
    impl NodeRegistry for Nodes {
        async fn node_exists(
            &self,
            pk: NodePk,
        ) -> Result<bool, RegistryError> {
            Ok(self
                .0
                .lock()
                .unwrap()
                .iter()
                .any(|n| n.pk == pk))
        }

        async fn get_node(
            &self,
            pk: NodePk,
        ) -> Result<Option<Node>, RegistryError> {
            Ok(self
                .0
                .lock()
                .unwrap()
                .iter()
                .find(|n| n.pk == pk)
                .cloned())
        }

        async fn add_or_update(
            &self,
            _signer: &LocalWallet,
            node: &Node,
        ) -> Result<(), RegistryError> {
            let mut nodes = self
                .0
                .lock()
                .unwrap();
            nodes.retain(|n| n.pk != node.pk);
            nodes.push(node.clone());
            Ok(())
        }

        async fn remove(
            &self,
            _signer: &LocalWallet,
            pk: NodePk,
        ) -> Result<(), RegistryError> {
            let mut nodes = self
                .0
                .lock()
                .unwrap();
            if !nodes
                .iter()
                .any(|n| n.pk == pk)
            {
                return Err(RegistryError::NotFound("Node"));
            }
            nodes.retain(|n| n.pk != pk);
            Ok(())
        }
    }

    fn signer() -> LocalWallet {
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
            .parse()
            .unwrap()
    }

    #[tokio::test]
    async fn test_node_lifecycle() {
        let registry = Nodes::default();
        let out = Recorder::default();
        let pk = format!("0x{}", "0e".repeat(32));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "pk": "{pk}",
                "owner": "0x70997970c51812dc3a010c7d01b50e0d17dc79c8",
                "teeType": "0x736778",
                "teeVer": "0x02",
                "attestation": "0xdeadbeef"
            }}"#
        )
        .unwrap();

        add_or_update(&registry, &out, &signer(), file.path())
            .await
            .unwrap();
        let node = get(&registry, &out, &pk)
            .await
            .unwrap();
        assert_eq!(node.pk, H256([0x0e; 32]));
        assert_eq!(
            node.owner,
            "0x70997970c51812dc3a010c7d01b50e0d17dc79c8"
                .parse::<Address>()
                .unwrap()
        );
        assert_eq!(node.tee_type.to_vec(), b"sgx".to_vec());
        assert!(out
            .logs()
            .iter()
            .any(|l| l.contains("Attestation: 0xdeadbeef")));

        remove(&registry, &out, &signer(), &pk)
            .await
            .unwrap();
        let err = remove(&registry, &out, &signer(), &pk)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Node does not exist");
    }
}
