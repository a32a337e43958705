//! The 4-byte header at the start of every node page.

use crate::core::consts::HEADER_SIZE;
use crate::core::error::NodeError;

type Result<T> = std::result::Result<T, NodeError>;

/// An enum representing a page's node type.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Internal = 1u16,
    Leaf = 2u16,
}

impl TryFrom<u16> for NodeType {
    type Error = NodeError;
    fn try_from(value: u16) -> Result<Self> {
        match value {
            1u16 => Ok(NodeType::Internal),
            2u16 => Ok(NodeType::Leaf),
            _ => Err(NodeError::UnexpectedNodeType(value)),
        }
    }
}

fn check_header(page: &[u8]) -> Result<()> {
    if page.len() < HEADER_SIZE {
        return Err(NodeError::OutOfBounds {
            pos: 0,
            len: HEADER_SIZE,
            cap: page.len(),
        });
    }
    Ok(())
}

/// Sets the node type and the number of keys of a node's page buffer.
pub fn set_header(page: &mut [u8], node_type: NodeType, n: usize) -> Result<()> {
    check_header(page)?;
    let n = u16::try_from(n).map_err(|_| NodeError::Overflow(n))?;
    page[0..2].copy_from_slice(&(node_type as u16).to_le_bytes());
    page[2..4].copy_from_slice(&n.to_le_bytes());
    Ok(())
}

/// Gets the node type of a node's page buffer.
pub fn get_node_type(page: &[u8]) -> Result<NodeType> {
    check_header(page)?;
    NodeType::try_from(u16::from_le_bytes([page[0], page[1]]))
}

/// Gets the number of keys in a node's page buffer.
pub fn get_num_keys(page: &[u8]) -> Result<usize> {
    check_header(page)?;
    Ok(u16::from_le_bytes([page[2], page[3]]) as usize)
}
