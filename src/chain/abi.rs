// Contract interfaces used by the client. Addresses live in config.

use ethers::prelude::abigen;

// Metapool factory
abigen!(
    CurveFactory,
    r#"[
        function pool_count() external view returns (uint256)
        function pool_list(uint256 arg0) external view returns (address)
        function get_coins(address _pool) external view returns (address[2])
    ]"#
);

// ERC20 (also the LP token interface of every factory pool)
abigen!(
    Erc20,
    r#"[
        function symbol() external view returns (string)
        function name() external view returns (string)
        function decimals() external view returns (uint8)
        function balanceOf(address _owner) external view returns (uint256)
        function allowance(address _owner, address _spender) external view returns (uint256)
        function approve(address _spender, uint256 _value) external returns (bool)
    ]"#
);

// Factory metapool
abigen!(
    MetaPool,
    r#"[
        function get_dy(int128 i, int128 j, uint256 dx) external view returns (uint256)
        function exchange(int128 i, int128 j, uint256 dx, uint256 min_dy) external returns (uint256)
    ]"#
);

// USD and BTC depositers share one interface
abigen!(
    Depositer,
    r#"[
        function calc_token_amount(address _pool, uint256[4] _amounts, bool _is_deposit) external view returns (uint256)
        function add_liquidity(address _pool, uint256[4] _deposit_amounts, uint256 _min_mint_amount) external returns (uint256)
        function remove_liquidity(address _pool, uint256 _burn_amount, uint256[4] _min_amounts) external returns (uint256[4])
        function calc_withdraw_one_coin(address _pool, uint256 _token_amount, int128 i) external view returns (uint256)
        function remove_liquidity_one_coin(address _pool, uint256 _burn_amount, int128 i, uint256 _min_amount) external returns (uint256)
    ]"#
);
