mod block_cache;
