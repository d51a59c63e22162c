//! Known contract interfaces used outside the generic catalogs.
//!
//! Everything dynamic (entry/exit/deep-scan candidates) is encoded in
//! `catalog`; the interfaces here are the fixed plumbing: ERC-20, wrapped
//! native and the Uniswap V3 router.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::sol;

sol! {
    // ERC-20 / ERC-4626 views
    function asset() external view returns (address);
    function token() external view returns (address);
    function balanceOf(address account) external view returns (uint256);
    function totalAssets() external view returns (uint256);
    function totalSupply() external view returns (uint256);

    // ERC-20 mutations
    function approve(address spender, uint256 amount) external returns (bool);
    function transfer(address to, uint256 amount) external returns (bool);

    // Wrapped native
    function deposit() external payable;
    function withdraw(uint256 wad) external;

    // Uniswap V3 SwapRouter
    struct ExactInputSingleParams {
        address tokenIn;
        address tokenOut;
        uint24 fee;
        address recipient;
        uint256 deadline;
        uint256 amountIn;
        uint256 amountOutMinimum;
        uint160 sqrtPriceLimitX96;
    }
    function exactInputSingle(ExactInputSingleParams params) external payable returns (uint256 amountOut);
}

/// Decode a single uint256 return word. Empty output decodes to zero.
pub fn decode_uint(ret: &Bytes) -> U256 {
    if ret.len() >= 32 {
        U256::from_be_slice(&ret[ret.len() - 32..])
    } else {
        U256::ZERO
    }
}

/// Decode a single address return word.
pub fn decode_address(ret: &Bytes) -> Option<Address> {
    if ret.len() >= 32 {
        Some(Address::from_slice(&ret[12..32]))
    } else {
        None
    }
}
